/// Generation quota tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanType {
    Free,
    Starter,
    Unlimited,
}

impl PlanType {
    /// Stored in place of an infinite quota.
    pub const UNLIMITED_GENERATIONS: i32 = 999_999;

    /// Plan names without a tier of their own (`pending`, `unknown`, ...) get the free quota.
    pub fn from_plan_name(name: &str) -> PlanType {
        match name.trim().to_lowercase().as_str() {
            "starter" => PlanType::Starter,
            "unlimited" => PlanType::Unlimited,
            _ => PlanType::Free,
        }
    }

    pub fn monthly_generations(&self) -> i32 {
        match self {
            PlanType::Free => 5,
            PlanType::Starter => 100,
            PlanType::Unlimited => Self::UNLIMITED_GENERATIONS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Starter => "starter",
            PlanType::Unlimited => "unlimited",
        }
    }
}

/// The plan label written to `subscriptions.plan_type`.
///
/// Unlike [`PlanType`] this keeps whatever the payment processor called the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanName(String);

impl PlanName {
    pub fn free() -> PlanName {
        Self(PlanType::Free.as_str().into())
    }

    pub fn pending() -> PlanName {
        Self("pending".into())
    }

    pub fn unknown() -> PlanName {
        Self("unknown".into())
    }

    /// "Starter Plan" -> "starter".
    pub fn from_price_nickname(nickname: &str) -> Option<PlanName> {
        nickname
            .split(' ')
            .next()
            .map(str::to_lowercase)
            .filter(|word| !word.is_empty())
            .map(Self)
    }

    /// "Unlimited Wallpapers" -> "unlimited_wallpapers".
    pub fn from_product_name(name: &str) -> Option<PlanName> {
        let name = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        (!name.is_empty()).then(|| Self(name))
    }

    pub fn from_label(label: &str) -> Option<PlanName> {
        let label = label.trim().to_lowercase();
        (!label.is_empty()).then(|| Self(label))
    }

    pub fn plan_type(&self) -> PlanType {
        PlanType::from_plan_name(&self.0)
    }
}

impl AsRef<str> for PlanName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

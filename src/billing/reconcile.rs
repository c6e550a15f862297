use crate::billing::{
    apply_usage_limit, from_unix_timestamp, one_month_after, revert_subscription_to_free,
    update_subscription_status, upsert_subscription,
};
use crate::domain::{PlanName, PlanType};
use crate::models::SubscriptionRecord;
use crate::stripe::{
    EventObject, StripeCheckoutSession, StripeClient, StripeCustomerId, StripeInvoice,
    StripeSubscription, WebhookEvent,
};
use chrono::{DateTime, Utc};
use diesel::{PgConnection, QueryResult};
use uuid::Uuid;

const PLAN_NAME_METADATA_KEY: &str = "planName";
const PRICE_ID_METADATA_KEY: &str = "priceId";

/// What a webhook event means for the local tables.
#[derive(Debug, PartialEq)]
pub enum Reconciliation {
    /// Replace the user's subscription row and resize their quota.
    Subscribed {
        record: SubscriptionRecord,
        plan: PlanName,
    },
    /// The paid plan ended; the user is back on the free tier.
    Canceled { user_id: Uuid },
    StatusChanged {
        user_id: Uuid,
        status: String,
        current_period_end: Option<DateTime<Utc>>,
    },
    Ignored(String),
}

impl Reconciliation {
    fn ignored(reason: impl Into<String>) -> Reconciliation {
        Reconciliation::Ignored(reason.into())
    }
}

/// Work out the local effect of `event`, asking Stripe for whatever the payload leaves out.
#[tracing::instrument(
    name = "Reconcile a Stripe event",
    skip(stripe, event, now),
    fields(event_id = %event.id, event_type = %event.kind)
)]
pub async fn reconcile(
    stripe: &dyn StripeClient,
    event: &WebhookEvent,
    now: DateTime<Utc>,
) -> Result<Reconciliation, anyhow::Error> {
    let reconciliation = match event.object()? {
        EventObject::CheckoutSessionCompleted(session) => {
            checkout_completed(stripe, &session, now).await
        }
        EventObject::SubscriptionCreated(subscription) => {
            subscription_changed(stripe, &subscription, Some(false), now).await
        }
        EventObject::SubscriptionUpdated(subscription) => {
            subscription_changed(stripe, &subscription, None, now).await
        }
        EventObject::SubscriptionDeleted(subscription) => {
            match user_id_for_subscription(stripe, &subscription).await {
                Some(user_id) => Reconciliation::Canceled { user_id },
                None => Reconciliation::ignored("No user id found for the subscription."),
            }
        }
        EventObject::InvoicePaymentSucceeded(invoice) => {
            invoice_settled(stripe, &invoice, true).await
        }
        EventObject::InvoicePaymentFailed(invoice) => {
            invoice_settled(stripe, &invoice, false).await
        }
        EventObject::Other => {
            Reconciliation::ignored(format!("Unhandled event type: {}", event.kind))
        }
    };
    Ok(reconciliation)
}

/// Write a reconciliation to the database.
#[tracing::instrument(name = "Apply a reconciliation", skip(conn))]
pub fn apply_reconciliation(
    conn: &mut PgConnection,
    reconciliation: &Reconciliation,
) -> QueryResult<()> {
    match reconciliation {
        Reconciliation::Subscribed { record, plan } => {
            upsert_subscription(conn, record)?;
            apply_usage_limit(conn, record.user_id, plan.plan_type())?;
        }
        Reconciliation::Canceled { user_id } => {
            revert_subscription_to_free(conn, *user_id)?;
            apply_usage_limit(conn, *user_id, PlanType::Free)?;
        }
        Reconciliation::StatusChanged {
            user_id,
            status,
            current_period_end,
        } => {
            update_subscription_status(conn, *user_id, status, *current_period_end)?;
        }
        Reconciliation::Ignored(reason) => {
            tracing::info!("Nothing to apply: {}", reason);
        }
    }
    Ok(())
}

async fn checkout_completed(
    stripe: &dyn StripeClient,
    session: &StripeCheckoutSession,
    now: DateTime<Utc>,
) -> Reconciliation {
    let user_id = match session.metadata.user_id().and_then(parse_user_id) {
        Some(user_id) => user_id,
        None => {
            tracing::warn!("Missing userId in checkout session {} metadata", session.id);
            return Reconciliation::ignored("Missing userId in checkout session metadata.");
        }
    };
    let requested_plan = session
        .metadata
        .get(PLAN_NAME_METADATA_KEY)
        .and_then(PlanName::from_label);

    let default_period = (now, one_month_after(now));
    let (status, plan, (period_start, period_end)) = match &session.subscription {
        Some(subscription_id) => match stripe.get_subscription(subscription_id).await {
            Ok(subscription) => {
                let plan = subscription
                    .first_price()
                    .and_then(|price| price.nickname.as_deref())
                    .and_then(PlanName::from_price_nickname)
                    .or(requested_plan)
                    .unwrap_or_else(PlanName::unknown);
                let period = (
                    subscription
                        .period_start()
                        .and_then(from_unix_timestamp)
                        .unwrap_or(default_period.0),
                    subscription
                        .period_end()
                        .and_then(from_unix_timestamp)
                        .unwrap_or(default_period.1),
                );
                (subscription.status, plan, period)
            }
            Err(error) => {
                tracing::warn!(
                    error.cause_chain = ?error,
                    "Failed to retrieve subscription {}, using a one month period",
                    subscription_id
                );
                let plan = requested_plan.unwrap_or_else(PlanName::free);
                ("active".to_string(), plan, default_period)
            }
        },
        None => {
            let plan = requested_plan.unwrap_or_else(PlanName::unknown);
            ("active".to_string(), plan, default_period)
        }
    };

    Reconciliation::Subscribed {
        record: SubscriptionRecord {
            user_id,
            stripe_customer_id: session.customer.as_ref().map(ToString::to_string),
            stripe_subscription_id: session.subscription.as_ref().map(ToString::to_string),
            plan_id: session
                .metadata
                .get(PRICE_ID_METADATA_KEY)
                .map(ToString::to_string),
            plan_type: plan.to_string(),
            status,
            cancel_at_period_end: false,
            current_period_start: Some(period_start),
            current_period_end: Some(period_end),
            updated_at: now,
        },
        plan,
    }
}

/// `cancel_at_period_end` overrides the flag Stripe reports when set.
async fn subscription_changed(
    stripe: &dyn StripeClient,
    subscription: &StripeSubscription,
    cancel_at_period_end: Option<bool>,
    now: DateTime<Utc>,
) -> Reconciliation {
    let user_id = match user_id_for_subscription(stripe, subscription).await {
        Some(user_id) => user_id,
        None => return Reconciliation::ignored("No user id found for the subscription."),
    };
    let plan = plan_for_subscription(stripe, subscription).await;

    Reconciliation::Subscribed {
        record: SubscriptionRecord {
            user_id,
            stripe_customer_id: Some(subscription.customer.to_string()),
            stripe_subscription_id: Some(subscription.id.to_string()),
            plan_id: subscription.first_price().map(|price| price.id.to_string()),
            plan_type: plan.to_string(),
            status: subscription.status.clone(),
            cancel_at_period_end: cancel_at_period_end
                .unwrap_or(subscription.cancel_at_period_end),
            current_period_start: subscription.period_start().and_then(from_unix_timestamp),
            current_period_end: subscription.period_end().and_then(from_unix_timestamp),
            updated_at: now,
        },
        plan,
    }
}

async fn invoice_settled(
    stripe: &dyn StripeClient,
    invoice: &StripeInvoice,
    succeeded: bool,
) -> Reconciliation {
    let subscription_id = match &invoice.subscription {
        Some(subscription_id) => subscription_id,
        None => {
            return Reconciliation::ignored(format!("Invoice {} has no subscription.", invoice.id))
        }
    };

    let subscription = match stripe.get_subscription(subscription_id).await {
        Ok(subscription) => Some(subscription),
        Err(error) => {
            tracing::warn!(
                error.cause_chain = ?error,
                "Failed to retrieve subscription {}",
                subscription_id
            );
            None
        }
    };
    let from_customer = match &invoice.customer {
        Some(customer_id) if subscription.is_some() => {
            user_id_from_customer(stripe, customer_id).await
        }
        _ => None,
    };
    let user_id = from_customer
        .or_else(|| {
            subscription
                .as_ref()
                .and_then(|subscription| subscription.metadata.user_id())
                .and_then(parse_user_id)
        })
        .or_else(|| invoice.metadata.user_id().and_then(parse_user_id));

    let user_id = match user_id {
        Some(user_id) => user_id,
        None => {
            return Reconciliation::ignored(format!(
                "No user id found for invoice {}.",
                invoice.id
            ))
        }
    };
    match subscription {
        Some(subscription) => Reconciliation::StatusChanged {
            user_id,
            current_period_end: match succeeded {
                true => subscription.period_end().and_then(from_unix_timestamp),
                false => None,
            },
            status: subscription.status,
        },
        None => Reconciliation::ignored(format!(
            "No subscription details for invoice {}.",
            invoice.id
        )),
    }
}

/// Customer metadata first, then the subscription's own metadata.
async fn user_id_for_subscription(
    stripe: &dyn StripeClient,
    subscription: &StripeSubscription,
) -> Option<Uuid> {
    match user_id_from_customer(stripe, &subscription.customer).await {
        Some(user_id) => Some(user_id),
        None => subscription.metadata.user_id().and_then(parse_user_id),
    }
}

async fn user_id_from_customer(
    stripe: &dyn StripeClient,
    customer_id: &StripeCustomerId,
) -> Option<Uuid> {
    match stripe.get_customer(customer_id).await {
        Ok(customer) => customer.metadata.user_id().and_then(parse_user_id),
        Err(error) => {
            tracing::warn!(
                error.cause_chain = ?error,
                "Failed to retrieve customer {}",
                customer_id
            );
            None
        }
    }
}

/// Price nickname, then product name, then the `planName` metadata.
async fn plan_for_subscription(
    stripe: &dyn StripeClient,
    subscription: &StripeSubscription,
) -> PlanName {
    let price = subscription.first_price();
    if let Some(plan) = price
        .and_then(|price| price.nickname.as_deref())
        .and_then(PlanName::from_price_nickname)
    {
        return plan;
    }
    if let Some(product_id) = price.and_then(|price| price.product.as_ref()) {
        match stripe.get_product(product_id).await {
            Ok(product) => {
                if let Some(plan) = PlanName::from_product_name(&product.name) {
                    return plan;
                }
            }
            Err(error) => tracing::warn!(
                error.cause_chain = ?error,
                "Failed to retrieve product {}",
                product_id
            ),
        }
    }
    subscription
        .metadata
        .get(PLAN_NAME_METADATA_KEY)
        .and_then(PlanName::from_label)
        .unwrap_or_else(PlanName::unknown)
}

fn parse_user_id(user_id: &str) -> Option<Uuid> {
    match Uuid::parse_str(user_id) {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            tracing::warn!("Ignoring malformed user id {:?} in Stripe metadata", user_id);
            None
        }
    }
}

use crate::billing::one_month_after;
use crate::domain::PlanType;
use crate::models::{
    NewProfile, NewSubscriptionHistory, NewUsage, Subscription, SubscriptionRecord, Usage,
};
use crate::schema::{profiles, subscription_history, subscriptions, usage};
use chrono::{DateTime, Utc};
use diesel::{
    Connection, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, QueryResult,
    RunQueryDsl,
};
use uuid::Uuid;

#[tracing::instrument(name = "Fetch a user's subscription", skip(conn))]
pub fn find_subscription(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<Option<Subscription>> {
    subscriptions::table
        .filter(subscriptions::user_id.eq(user_id))
        .first::<Subscription>(conn)
        .optional()
}

/// Write `record` as the user's only subscription row.
#[tracing::instrument(name = "Upsert a subscription", skip(conn))]
pub fn upsert_subscription(
    conn: &mut PgConnection,
    record: &SubscriptionRecord,
) -> QueryResult<Subscription> {
    diesel::insert_into(subscriptions::table)
        .values((
            subscriptions::id.eq(Uuid::new_v4()),
            subscriptions::created_at.eq(record.updated_at),
            record,
        ))
        .on_conflict(subscriptions::user_id)
        .do_update()
        .set(record)
        .get_result(conn)
}

#[tracing::instrument(name = "Update a subscription's status", skip(conn))]
pub fn update_subscription_status(
    conn: &mut PgConnection,
    user_id: Uuid,
    status: &str,
    current_period_end: Option<DateTime<Utc>>,
) -> QueryResult<usize> {
    let target = subscriptions::table.filter(subscriptions::user_id.eq(user_id));
    match current_period_end {
        Some(period_end) => diesel::update(target)
            .set((
                subscriptions::status.eq(status),
                subscriptions::current_period_end.eq(period_end),
                subscriptions::updated_at.eq(Utc::now()),
            ))
            .execute(conn),
        None => diesel::update(target)
            .set((
                subscriptions::status.eq(status),
                subscriptions::updated_at.eq(Utc::now()),
            ))
            .execute(conn),
    }
}

#[tracing::instrument(name = "Clear a pending cancellation", skip(conn))]
pub fn clear_cancel_at_period_end(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<usize> {
    diesel::update(subscriptions::table.filter(subscriptions::user_id.eq(user_id)))
        .set((
            subscriptions::cancel_at_period_end.eq(false),
            subscriptions::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
}

/// Keep the row but drop the paid plan.
#[tracing::instrument(name = "Revert a subscription to the free plan", skip(conn))]
pub fn revert_subscription_to_free(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<usize> {
    diesel::update(subscriptions::table.filter(subscriptions::user_id.eq(user_id)))
        .set((
            subscriptions::plan_type.eq(PlanType::Free.as_str()),
            subscriptions::plan_id.eq(None::<String>),
            subscriptions::status.eq("canceled"),
            subscriptions::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
}

#[tracing::instrument(name = "Delete a subscription", skip(conn))]
pub fn delete_subscription(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<usize> {
    diesel::delete(subscriptions::table.filter(subscriptions::user_id.eq(user_id))).execute(conn)
}

#[tracing::instrument(name = "Record a plan change", skip(conn))]
pub fn record_plan_change(
    conn: &mut PgConnection,
    user_id: Uuid,
    action: &str,
    from_plan: &str,
    to_plan: &str,
) -> QueryResult<usize> {
    diesel::insert_into(subscription_history::table)
        .values(NewSubscriptionHistory {
            id: &Uuid::new_v4(),
            user_id: &user_id,
            action,
            from_plan,
            to_plan,
            created_at: &Utc::now(),
        })
        .execute(conn)
}

#[tracing::instrument(name = "Fetch a user's usage", skip(conn))]
pub fn find_usage(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<Usage>> {
    usage::table
        .filter(usage::user_id.eq(user_id))
        .first::<Usage>(conn)
        .optional()
}

/// Set the monthly quota of `plan`, creating an empty usage row when there is none.
#[tracing::instrument(name = "Apply a plan's usage limit", skip(conn))]
pub fn apply_usage_limit(
    conn: &mut PgConnection,
    user_id: Uuid,
    plan: PlanType,
) -> QueryResult<Usage> {
    let now = Utc::now();
    let limit = plan.monthly_generations();
    diesel::insert_into(usage::table)
        .values(NewUsage {
            id: &Uuid::new_v4(),
            user_id: &user_id,
            monthly_generations: limit,
            count: 0,
            total_generations: 0,
            reset_date: Some(&one_month_after(now)),
            created_at: &now,
            updated_at: &now,
        })
        .on_conflict(usage::user_id)
        .do_update()
        .set((
            usage::monthly_generations.eq(limit),
            usage::updated_at.eq(now),
        ))
        .get_result(conn)
}

/// Count one generation against the user's quota.
///
/// A period whose `reset_date` has passed is restarted before counting. A user
/// without a usage row gets one sized for their current plan.
#[tracing::instrument(name = "Record a generation", skip(conn))]
pub fn record_generation(
    conn: &mut PgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> QueryResult<Usage> {
    conn.transaction(|conn| {
        let plan = find_subscription(conn, user_id)?
            .map(|subscription| PlanType::from_plan_name(&subscription.plan_type))
            .unwrap_or(PlanType::Free);
        let next_reset = one_month_after(now);
        diesel::insert_into(usage::table)
            .values(NewUsage {
                id: &Uuid::new_v4(),
                user_id: &user_id,
                monthly_generations: plan.monthly_generations(),
                count: 0,
                total_generations: 0,
                reset_date: Some(&next_reset),
                created_at: &now,
                updated_at: &now,
            })
            .on_conflict(usage::user_id)
            .do_nothing()
            .execute(conn)?;

        diesel::update(
            usage::table
                .filter(usage::user_id.eq(user_id))
                .filter(usage::reset_date.le(now)),
        )
        .set((usage::count.eq(0), usage::reset_date.eq(next_reset)))
        .execute(conn)?;
        diesel::update(
            usage::table
                .filter(usage::user_id.eq(user_id))
                .filter(usage::reset_date.is_null()),
        )
        .set(usage::reset_date.eq(next_reset))
        .execute(conn)?;

        diesel::update(usage::table.filter(usage::user_id.eq(user_id)))
            .set((
                usage::count.eq(usage::count + 1),
                usage::total_generations.eq(usage::total_generations + 1),
                usage::last_generated_at.eq(now),
                usage::updated_at.eq(now),
            ))
            .get_result(conn)
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum Provisioning {
    Created,
    AlreadyExists,
}

/// Create the profile of a new user along with a free subscription and a usage row.
///
/// Only the profile insert is fatal; the other two rows are best effort.
#[tracing::instrument(
    name = "Provision a new user",
    skip(conn, profile),
    fields(user_id = %profile.id)
)]
pub fn provision_user(
    conn: &mut PgConnection,
    profile: NewProfile<'_>,
) -> QueryResult<Provisioning> {
    let user_id = *profile.id;
    let existing = profiles::table
        .select(profiles::id)
        .filter(profiles::id.eq(user_id))
        .first::<Uuid>(conn)
        .optional()?;
    if existing.is_some() {
        tracing::info!("Profile already exists");
        return Ok(Provisioning::AlreadyExists);
    }

    let inserted = diesel::insert_into(profiles::table)
        .values(&profile)
        .on_conflict(profiles::id)
        .do_nothing()
        .execute(conn)?;
    if inserted == 0 {
        return Ok(Provisioning::AlreadyExists);
    }

    let now = Utc::now();
    let free_plan = SubscriptionRecord {
        user_id,
        stripe_customer_id: None,
        stripe_subscription_id: None,
        plan_id: Some("free_plan".into()),
        plan_type: PlanType::Free.as_str().into(),
        status: "active".into(),
        cancel_at_period_end: false,
        current_period_start: Some(now),
        current_period_end: Some(one_month_after(now)),
        updated_at: now,
    };
    let subscription_created = diesel::insert_into(subscriptions::table)
        .values((
            subscriptions::id.eq(Uuid::new_v4()),
            subscriptions::created_at.eq(now),
            &free_plan,
        ))
        .on_conflict(subscriptions::user_id)
        .do_nothing()
        .execute(conn);
    if let Err(error) = subscription_created {
        tracing::error!(error.cause_chain = ?error, "Failed to create the free subscription");
    }

    if let Err(error) = apply_usage_limit(conn, user_id, PlanType::Free) {
        tracing::error!(error.cause_chain = ?error, "Failed to create the usage record");
    }
    Ok(Provisioning::Created)
}

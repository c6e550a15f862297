diesel::table! {
    profiles (id) {
        id -> Uuid,
        email -> Nullable<Text>,
        full_name -> Nullable<Text>,
        display_name -> Nullable<Text>,
        avatar_url -> Nullable<Text>,
        is_profile_public -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Uuid,
        user_id -> Uuid,
        stripe_customer_id -> Nullable<Text>,
        stripe_subscription_id -> Nullable<Text>,
        plan_id -> Nullable<Text>,
        plan_type -> Text,
        status -> Text,
        cancel_at_period_end -> Bool,
        current_period_start -> Nullable<Timestamptz>,
        current_period_end -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    usage (id) {
        id -> Uuid,
        user_id -> Uuid,
        monthly_generations -> Int4,
        count -> Int4,
        total_generations -> Int4,
        reset_date -> Nullable<Timestamptz>,
        last_generated_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    wallpapers (id) {
        id -> Uuid,
        user_id -> Uuid,
        prompt -> Text,
        style -> Nullable<Text>,
        aspect_ratio -> Text,
        image_url -> Text,
        thumbnail_url -> Nullable<Text>,
        is_public -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    contact_messages (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        message -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    newsletter_signups (id) {
        id -> Uuid,
        email -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    subscription_history (id) {
        id -> Uuid,
        user_id -> Uuid,
        action -> Text,
        from_plan -> Text,
        to_plan -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    profiles,
    subscriptions,
    usage,
    wallpapers,
    contact_messages,
    newsletter_signups,
    subscription_history,
);

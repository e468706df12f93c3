table! {
    subscription_plans (id) {
        id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        price_cents -> Int4,
        currency -> Text,
        billing_interval -> Text,
        stripe_price_id -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

table! {
    user_subscriptions (user_id) {
        user_id -> Uuid,
        plan_id -> Nullable<Uuid>,
        stripe_subscription_id -> Nullable<Text>,
        status -> Text,
        current_period_end -> Nullable<Timestamptz>,
    }
}

joinable!(user_subscriptions -> subscription_plans (plan_id));

allow_tables_to_appear_in_same_query!(subscription_plans, user_subscriptions);

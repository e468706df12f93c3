use crate::helpers::spawn_app;
use dieta_billing::routes::PlanResponse;

#[tokio::test]
async fn active_plans_are_listed_cheapest_first() {
    // arrange
    let app = spawn_app().await;
    let yearly = app.insert_plan("Premium Anual", 29900, Some("price_premium_yearly"));
    let monthly = app.insert_plan("Premium Mensal", 2990, Some("price_premium_monthly"));
    let free = app.insert_plan("Gratuito", 0, None);

    // act
    let response = app
        .api_client
        .get(&format!("{}/plans", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let plans: Vec<PlanResponse> = response.json().await.unwrap();
    let ids: Vec<_> = plans.iter().map(|plan| plan.id).collect();
    assert_eq!(ids, vec![free, monthly, yearly]);
    assert_eq!(plans[0].stripe_price_id, None);
    assert_eq!(plans[1].currency, "brl");
    assert_eq!(plans[1].billing_interval, "month");
}

#[tokio::test]
async fn inactive_plans_are_hidden() {
    // arrange
    let app = spawn_app().await;
    let plan_id = app.insert_plan("Premium Legado", 1990, Some("price_legacy"));
    app.deactivate_plan(plan_id);

    // act
    let plans: Vec<PlanResponse> = app
        .api_client
        .get(&format!("{}/plans", app.address))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();

    // assert
    assert!(plans.is_empty());
}

#[rocket::launch]
fn rocket() -> _ {
    let rocket = case_views::rocket();
    log::info!("starting case-views server");
    rocket
}

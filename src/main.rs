#[rocket::launch]
fn rocket() -> _ {
    let rocket = catalog_importer::rocket();
    log::info!("starting catalog importer API server");
    rocket
}

use log::{error, info, LevelFilter};

async fn run() -> Result<(), rocket::Error> {
    info!("Starting survey server...");
    let rocket = survey_backend::build().ignite().await?;
    info!("...ignition complete");
    // Silence rocket's logger; the fairing logs requests from here on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    // Logging comes up first so launch failures are captured.
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Could not initialise logging");
    info!("Logging initialised");

    if let Err(err) = run().await {
        error!("{err}");
        error!("Unrecoverable failure, shutting down");
        std::process::exit(1)
    }
}

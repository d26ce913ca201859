// src/main.rs
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};

use price_control::config::Config;
use price_control::controller::DeviceController;
use price_control::decision::{self, run_control_loop};
use price_control::price_store::PriceStore;
use price_control::registry::DeviceRegistry;
use price_control::types::PowerAction;

#[derive(Parser)]
#[command(name = "price_control", version, about = "Spot-price control of Telldus power devices")]
struct Cli {
    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Run the periodic control loop (the default)
    Run,
    /// Print today's and tomorrow's price list with the trigger applied
    Prices,
    /// List devices reported by the Tellstick unit
    Devices,
    /// List devices registered for control
    List,
    /// Register a device; the name is looked up on the unit when omitted
    Add { id: String, name: Option<String> },
    /// Unregister a device
    Remove { id: String },
    /// Turn all registered devices on now
    On,
    /// Turn all registered devices off now
    Off,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let mut registry = DeviceRegistry::load(&config.devices_file)?;
    let store = PriceStore::new(&config);
    let controller = DeviceController::new(&config);

    match cli.command.unwrap_or(Action::Run) {
        Action::Run => {
            info!("Telldus Price Control starting. Price area: {}", config.area);
            run_control_loop(&config, &registry, &store, &controller).await;
        }
        Action::Prices => print_prices(&config, &store).await?,
        Action::Devices => {
            for device in controller.list_devices().await? {
                println!("{} - {}", device.id, device.name);
            }
        }
        Action::List => {
            for record in registry.list() {
                println!("{} - {}", record.id, record.name);
            }
        }
        Action::Add { id, name } => {
            let name = match name {
                Some(name) => name,
                None => lookup_device_name(&controller, &id).await,
            };
            registry.add(&id, &name)?;
            println!("Added {} - {}", id, name);
        }
        Action::Remove { id } => {
            registry.remove(&id)?;
            println!("Removed {}", id);
        }
        Action::On => controller.apply_state(PowerAction::On, &registry.list()).await,
        Action::Off => controller.apply_state(PowerAction::Off, &registry.list()).await,
    }

    Ok(())
}

async fn lookup_device_name(controller: &DeviceController, id: &str) -> String {
    match controller.list_devices().await {
        Ok(devices) => devices
            .into_iter()
            .find(|device| device.id == id)
            .map(|device| device.name)
            .unwrap_or_else(|| {
                warn!("Device {} not reported by the Tellstick unit", id);
                "Unknown device".to_string()
            }),
        Err(e) => {
            warn!("Could not query the Tellstick unit for device names: {}", e);
            "Unknown device".to_string()
        }
    }
}

async fn print_prices(
    config: &Config,
    store: &PriceStore,
) -> Result<(), Box<dyn std::error::Error>> {
    use price_control::types::TriggerState;

    let now = chrono::Local::now();
    let todays_prices = store.fetch_today(now.date_naive()).await;
    let tomorrows_prices = store
        .fetch_day(now.date_naive() + chrono::Duration::days(1))
        .await;

    let triggers = TriggerState::recompute(
        config.strategy,
        &todays_prices,
        tomorrows_prices.as_deref(),
    )?;

    println!("Price area: {}", config.area);
    println!("Trigger price today: {:.2} SEK / kWh", triggers.today);
    for entry in &todays_prices {
        let below = entry.sek_per_kwh < triggers.today;
        let is_now = entry.contains(now.fixed_offset());
        println!(
            "{}    {:.2} SEK{}{}",
            entry.interval_start.format("%Y-%m-%d    %H:%M"),
            entry.sek_per_kwh,
            if below { "    [ON]" } else { "" },
            if is_now { "    <-- Now" } else { "" },
        );
    }
    if let Some(avg) = decision::average_price(&todays_prices) {
        println!("Todays avg price: {:.2} SEK / kWh", avg);
    }

    match (tomorrows_prices, triggers.tomorrow) {
        (Some(series), Some(trigger)) => {
            println!("Trigger price tomorrow: {:.2} SEK / kWh", trigger);
            for entry in &series {
                let below = entry.sek_per_kwh < trigger;
                println!(
                    "{}    {:.2} SEK{}",
                    entry.interval_start.format("%Y-%m-%d    %H:%M"),
                    entry.sek_per_kwh,
                    if below { "    [ON]" } else { "" },
                );
            }
        }
        _ => println!("Tomorrows price not yet available"),
    }

    Ok(())
}

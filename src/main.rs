//! ClockClock sync module firmware: main entry point.
//!
//! Hexagonal architecture with two execution contexts.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardAdapter              LogEventSink   EepromStore          │
//! │  (AP+Join+Fetch+Clock)     (EventSink)    (PersistentStore)    │
//! │  I2cSlaveBus ── pump thread ──▶ BUS_LINK                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Settings · Feedback · Timezone                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Control loop (polling context) · Watchdog                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use clocksync::adapters::hardware::BoardAdapter;
use clocksync::adapters::i2c_slave::I2cSlaveBus;
use clocksync::adapters::log_sink::LogEventSink;
use clocksync::adapters::nvs::EepromStore;
use clocksync::adapters::portal::ProvisioningPortal;
use clocksync::adapters::sntp::SntpClient;
use clocksync::adapters::time::SystemClock;
use clocksync::adapters::wifi::WifiRadio;
use clocksync::app::service::AppService;
use clocksync::config::SystemConfig;
use clocksync::drivers::watchdog::Watchdog;
use clocksync::pins;
use clocksync::protocol::{BUS_LINK, pump};
use clocksync::settings::SettingsStore;

/// Pump cadence; the host polls far slower than this.
const BUS_PUMP_INTERVAL_MS: u64 = 2;
const BUS_THREAD_STACK: usize = 4096;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ClockClock sync v{}                 ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();

    // ── 2. Settings from EEPROM (shadow slots) ────────────────
    let eeprom = EepromStore::new().map_err(|e| anyhow::anyhow!("EEPROM init failed: {}", e))?;
    let settings = SettingsStore::new(eeprom);
    info!(
        "Settings: network '{}', {}",
        settings.get().ssid,
        if settings.get().is_protected { "protected" } else { "open" }
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 4. Host link: I²C slave driven by its own thread ──────
    info!(
        "I2C: SDA GPIO{} / SCL GPIO{}",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO
    );
    let mut bus = I2cSlaveBus::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
    )
    .context("I2C slave init failed")?;

    std::thread::Builder::new()
        .name("i2c-pump".into())
        .stack_size(BUS_THREAD_STACK)
        .spawn(move || {
            loop {
                if let Err(e) = pump(&BUS_LINK, &mut bus) {
                    warn!("I2C: pump error {:?}", e);
                }
                std::thread::sleep(Duration::from_millis(BUS_PUMP_INTERVAL_MS));
            }
        })
        .context("failed to spawn I2C pump thread")?;

    // ── 5. Radio, portal, SNTP, clock ─────────────────────────
    let wifi = WifiRadio::new(peripherals.modem, sysloop, nvs_partition, &config)
        .context("WiFi init failed")?;
    let mut hw = BoardAdapter::new(
        wifi,
        ProvisioningPortal::new(),
        SntpClient::new(),
        SystemClock::new(),
        config.clone(),
    );

    // ── 6. App service ────────────────────────────────────────
    let mut log_sink = LogEventSink::new();
    let mut app = AppService::new(config.clone(), settings);
    app.start(&mut hw, &mut log_sink);

    let watchdog = Watchdog::new(config.watchdog_timeout_secs);
    info!("System ready. Entering control loop.");

    // ── 7. Control loop (polling context) ─────────────────────
    loop {
        app.tick(&mut hw, &BUS_LINK, &mut log_sink);
        watchdog.feed();

        if app.tick_count() % 6000 == 0 {
            let rejected = BUS_LINK.rejected_frames();
            if rejected > 0 {
                warn!("I2C: {} frames rejected since boot", rejected);
            }
        }

        std::thread::sleep(Duration::from_millis(u64::from(config.control_loop_interval_ms)));
    }
}

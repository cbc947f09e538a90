use anyhow::Result;
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use log::info;

use pharmatracker::buttons::hw::GpioButtons;
use pharmatracker::buzzer::hw::LedcBuzzer;
use pharmatracker::controller::TagController;
use pharmatracker::decoder::hw::Em4095SampleSource;
use pharmatracker::lcd::hw::Hd44780Lcd;
use pharmatracker::logger::DualLogger;
use pharmatracker::registry::default_table;
use pharmatracker::screen::Navigator;
use pharmatracker::uplink::hw::EspWifiUplink;

// ── Configuration ──────────────────────────────────────────────────────────
// Carried over from `sentinel/build.rs`: these come from a `.env` file at
// build time via `dotenvy`, re-exported as `cargo::rustc-env` vars.

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASS: &str = env!("WIFI_PASS");
const UPLINK_HOST: &str = env!("UPLINK_HOST");
const UPLINK_PORT: &str = env!("UPLINK_PORT");

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    let tcp_handle = DualLogger::init();

    info!("PharmaTracker starting up");

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let pins = peripherals.pins;

    info!("Connecting to WiFi...");
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    connect_wifi(&mut wifi)?;
    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi connected — IP: {}", ip_info.ip);

    info!("Initializing LCD...");
    let lcd = Hd44780Lcd::new(
        [
            pins.gpio4.into(),
            pins.gpio5.into(),
            pins.gpio6.into(),
            pins.gpio7.into(),
        ],
        pins.gpio8.into(),
        pins.gpio9.into(),
    )?;

    info!("Initializing buttons...");
    let buttons = GpioButtons::new(
        pins.gpio10.into(),
        pins.gpio11.into(),
        pins.gpio12.into(),
        pins.gpio13.into(),
        pins.gpio14.into(),
    )?;

    info!("Initializing buzzer...");
    let buzzer = LedcBuzzer::new(peripherals.ledc.timer0, peripherals.ledc.channel0, pins.gpio19)?;

    info!("Initializing EM4095 sample source...");
    let sample_source = Em4095SampleSource::new(pins.gpio15.into())?;

    let uplink_addr = format!("{}:{}", UPLINK_HOST, UPLINK_PORT);
    let uplink = EspWifiUplink::new(uplink_addr, tcp_handle);

    let controller = TagController::new(default_table(), uplink);
    let mut navigator = Navigator::new(controller, sample_source, buttons, lcd, buzzer);

    navigator.on_startup();

    info!("Entering screen loop");
    navigator.run();
}

fn connect_wifi(wifi: &mut BlockingWifi<EspWifi<'static>>) -> Result<()> {
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID.try_into().map_err(|_| anyhow::anyhow!("SSID too long"))?,
        password: WIFI_PASS
            .try_into()
            .map_err(|_| anyhow::anyhow!("Password too long"))?,
        auth_method: AuthMethod::WPA2Personal,
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("WiFi started");
    wifi.connect()?;
    info!("WiFi associated");
    wifi.wait_netif_up()?;
    info!("WiFi network interface up");
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use periph_hal::bus::BusError;
use periph_hal::coprocessor::{decode_access_point_list, EventFrame, WiFiNetwork};
use periph_hal::native::NativeTransport;
use periph_hal::pins::{ChannelInfo, I2cChannelFunction, Pin, SpiChannelFunction};
use periph_hal::ports::{OutputType, ResistorMode};
use periph_hal::util::{decode_hex, format_mac_address};
use periph_hal::{init_logger, log_info, Device, HalConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "periph-cli")]
#[command(about = "CLI tool for board peripherals and coprocessor frames")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the board's pins and their channels
    Pins,
    /// Print the effective configuration
    ShowConfig,
    /// Read bytes from a two-wire peripheral
    I2cRead {
        #[arg(value_parser = parse_u8)]
        address: u8,
        #[arg(short, long, default_value = "1")]
        length: usize,
        /// Register written before the read
        #[arg(short, long, value_parser = parse_u8)]
        register: Option<u8>,
    },
    /// Probe every 7-bit address on the two-wire bus
    I2cScan,
    /// Read a digital input
    GpioRead { pin: String },
    /// Drive a digital output
    GpioWrite {
        pin: String,
        #[arg(long)]
        high: bool,
    },
    /// Decode a hex-encoded coprocessor event frame
    DecodeEvent { hex: String },
    /// Decode a hex-encoded access point list
    DecodeScan { hex: String },
}

fn parse_u8(text: &str) -> Result<u8, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid byte {text:?}: {e}"))
}

fn digital(interrupt: bool) -> ChannelInfo {
    ChannelInfo::Digital {
        input: true,
        output: true,
        interrupt,
    }
}

/// 40-pin header of a Raspberry Pi, keyed by BCM number.
fn header_pins() -> Vec<Pin> {
    let mut pins = vec![
        Pin::new(
            "GPIO2",
            2,
            vec![
                ChannelInfo::I2c {
                    bus: 1,
                    function: I2cChannelFunction::Data,
                },
                digital(false),
            ],
        ),
        Pin::new(
            "GPIO3",
            3,
            vec![
                ChannelInfo::I2c {
                    bus: 1,
                    function: I2cChannelFunction::Clock,
                },
                digital(false),
            ],
        ),
        Pin::new(
            "GPIO11",
            11,
            vec![ChannelInfo::Spi {
                bus: 0,
                function: SpiChannelFunction::Clock,
            }],
        ),
        Pin::new(
            "GPIO10",
            10,
            vec![ChannelInfo::Spi {
                bus: 0,
                function: SpiChannelFunction::Mosi,
            }],
        ),
        Pin::new(
            "GPIO9",
            9,
            vec![ChannelInfo::Spi {
                bus: 0,
                function: SpiChannelFunction::Miso,
            }],
        ),
        Pin::new("GPIO18", 18, vec![ChannelInfo::Pwm { timer: 0, channel: 0 }, digital(true)]),
    ];
    for key in [4u16, 5, 6, 8, 12, 13, 16, 17, 22, 23, 24, 25, 26, 27] {
        pins.push(Pin::new(format!("GPIO{key}"), key, vec![digital(true)]));
    }
    pins
}

#[cfg(feature = "raspberry-pi")]
fn native() -> anyhow::Result<Arc<dyn NativeTransport>> {
    let transport = periph_hal::native::RppalTransport::new()
        .context("failed to open the Raspberry Pi peripherals")?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "raspberry-pi"))]
fn native() -> anyhow::Result<Arc<dyn NativeTransport>> {
    log::warn!("Built without the raspberry-pi feature, using the simulated driver");
    Ok(Arc::new(periph_hal::native::MockTransport::new()))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HalConfig> {
    match path {
        Some(path) => HalConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(HalConfig::default()),
    }
}

fn scan_report(networks: &[WiFiNetwork]) -> String {
    let mut report = format!("{} access points\n", networks.len());
    for network in networks {
        report.push_str(&format!(
            "{:<32} {} ch {:>2} {:>4} dBm {:?}\n",
            network.ssid,
            format_mac_address(&network.bssid),
            network.primary_channel,
            network.rssi,
            network.authentication
        ));
    }
    report
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Pins => {
            for pin in header_pins() {
                println!("{:<8} key {:>3}  {}", pin.name(), pin.key(), pin.describe_channels());
            }
        }
        Commands::ShowConfig => {
            println!("{}", config.to_json_string()?);
        }
        Commands::I2cRead {
            address,
            length,
            register,
        } => {
            let device = Device::new(native()?, header_pins(), config)?;
            let bus = device.create_i2c_bus("GPIO3", "GPIO2", None)?;
            let mut buffer = vec![0u8; length];
            match register {
                Some(register) => bus.exchange(address, &[register], &mut buffer)?,
                None => bus.read(address, &mut buffer)?,
            }
            log_info(&format!("0x{address:02X}: {}", periph_hal::util::encode_hex(&buffer)));
        }
        Commands::I2cScan => {
            let device = Device::new(native()?, header_pins(), config)?;
            let bus = device.create_i2c_bus("GPIO3", "GPIO2", None)?;
            let mut found = 0;
            for address in 0x08..=0x77u8 {
                match bus.read(address, &mut [0u8; 1]) {
                    Ok(()) => {
                        found += 1;
                        log_info(&format!("Device: 0x{address:02X}"));
                    }
                    Err(BusError::NoDevice { .. } | BusError::NoAcknowledge { .. }) => {}
                    Err(e) => {
                        return Err::<(), _>(e).context(format!("probe of 0x{address:02X} failed"))
                    }
                }
            }
            log_info(&format!("{found} devices found"));
        }
        Commands::GpioRead { pin } => {
            let device = Device::new(native()?, header_pins(), config)?;
            let port = device.create_digital_input_port(&pin, ResistorMode::Disabled)?;
            log_info(&format!("{pin}: {}", if port.state()? { "high" } else { "low" }));
        }
        Commands::GpioWrite { pin, high } => {
            let device = Device::new(native()?, header_pins(), config)?;
            let port = device.create_digital_output_port(&pin, high, OutputType::PushPull)?;
            port.set_state(high)?;
            log_info(&format!("{pin} driven {}", if high { "high" } else { "low" }));
        }
        Commands::DecodeEvent { hex } => {
            let frame = decode_hex(&hex)?;
            let event = EventFrame::decode(&frame)?;
            println!(
                "{:?} status={} payload={}",
                event.function,
                event.status,
                periph_hal::util::format_hex_compact(&event.payload)
            );
        }
        Commands::DecodeScan { hex } => {
            let payload = decode_hex(&hex)?;
            let networks = decode_access_point_list(&payload)?;
            print!("{}", scan_report(&networks));
        }
    }

    Ok(())
}

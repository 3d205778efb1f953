use clap::Parser;
use core::sync::atomic::{AtomicU8, Ordering};
use embassy_executor::{Executor, Spawner};
use embassy_time::{Duration, Timer};
use embedded_hal::{digital, pwm};
use lfr_core::utils::{
    Shutdown,
    config::{DisablePolicy, RobotConfig},
    controllers::{
        CommandCell, DriveDispatcher, DriveState, DriveStateCell, EnableCell, LineSensorArray,
        MotorCommand, MotorSpeedController, PhaseEnableDriver, SensorClassifier,
    },
};
use static_cell::StaticCell;
use std::convert::Infallible;
use tracing::{debug, error, info};

/// Sensor pattern under the simulated array, bit i = sensor index i.
static TRACK: AtomicU8 = AtomicU8::new(0);

/// One stop signal per task loop; a `Signal` wakes a single waiter.
static SHUTDOWN: [Shutdown; 4] = [
    Shutdown::new(),
    Shutdown::new(),
    Shutdown::new(),
    Shutdown::new(),
];

/// Straight, drift, straight, drift, lost line, hard edge, recover.
const DEFAULT_TRACK: [u8; 8] = [0x18, 0x30, 0x18, 0x0C, 0x00, 0xF0, 0x0F, 0x18];

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON configuration file; missing fields use defaults
    #[clap(long)]
    config: Option<std::path::PathBuf>,
    /// override the classifier period (ms)
    #[clap(long)]
    classify_ms: Option<u64>,
    /// override the dispatcher period (ms)
    #[clap(long)]
    dispatch_ms: Option<u64>,
    /// override the motor control period (ms)
    #[clap(long)]
    motor_ms: Option<u64>,
    /// brake both wheels while disabled instead of holding the last command
    #[clap(long)]
    stop_on_disable: bool,
    /// delay before the simulated receiver raises the enable flag (ms)
    #[clap(long, default_value_t = 200)]
    arm_after_ms: u64,
    /// drop the enable flag again after this long (ms)
    #[clap(long)]
    disarm_after_ms: Option<u64>,
    /// comma-separated sensor masks to replay, e.g. 0x18,0x30,0xF0
    #[clap(long, value_delimiter = ',', value_parser = parse_mask)]
    track: Vec<u8>,
    /// time each track mask stays under the array (ms)
    #[clap(long, default_value_t = 250)]
    segment_ms: u64,
    /// total simulated run time (ms)
    #[clap(long, default_value_t = 3000)]
    run_for_ms: u64,
}

fn parse_mask(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0b")) {
        Some(digits) if s.starts_with("0x") => u8::from_str_radix(digits, 16),
        Some(digits) => u8::from_str_radix(digits, 2),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid sensor mask {s:?}: {e}"))
}

fn load_config(opts: &Opts) -> Result<RobotConfig, String> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))?
        }
        None => RobotConfig::default(),
    };
    if let Some(ms) = opts.classify_ms {
        config.timing.classify_period_ms = ms;
    }
    if let Some(ms) = opts.dispatch_ms {
        config.timing.dispatch_period_ms = ms;
    }
    if let Some(ms) = opts.motor_ms {
        config.timing.motor_period_ms = ms;
    }
    if opts.stop_on_disable {
        config.on_disable = DisablePolicy::Stop;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Input pin reading one bit of `TRACK`.
struct SimSensorPin {
    index: usize,
}

impl digital::ErrorType for SimSensorPin {
    type Error = Infallible;
}

impl digital::InputPin for SimSensorPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(TRACK.load(Ordering::Relaxed) & (1 << self.index) != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Phase pin that logs its level.
struct TracePin {
    wheel: &'static str,
    pin: u8,
}

impl digital::ErrorType for TracePin {
    type Error = Infallible;
}

impl digital::OutputPin for TracePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!(wheel = self.wheel, pin = self.pin, "phase LOW");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!(wheel = self.wheel, pin = self.pin, "phase HIGH");
        Ok(())
    }
}

/// 8-bit PWM channel that logs its duty.
struct TracePwm {
    wheel: &'static str,
    pin: u8,
}

impl pwm::ErrorType for TracePwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for TracePwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        debug!(wheel = self.wheel, pin = self.pin, duty, "pwm duty");
        Ok(())
    }
}

type Wheel = MotorSpeedController<'static, PhaseEnableDriver<TracePin, TracePwm>>;

#[embassy_executor::task]
async fn classifier_task(mut classifier: SensorClassifier<'static, SimSensorPin>) {
    classifier.run(&SHUTDOWN[0]).await
}

#[embassy_executor::task]
async fn dispatcher_task(mut dispatcher: DriveDispatcher<'static>) {
    dispatcher.run(&SHUTDOWN[1]).await
}

#[embassy_executor::task(pool_size = 2)]
async fn motor_task(
    mut wheel: Wheel,
    shutdown: &'static Shutdown,
) {
    wheel.run(shutdown).await
}

/// Stand-in for the wireless receiver: arms, and optionally disarms, on a timer.
#[embassy_executor::task]
async fn receiver_task(
    enable: &'static EnableCell,
    arm_after: Duration,
    disarm_after: Option<Duration>,
) {
    Timer::after(arm_after).await;
    info!("receiver: enable");
    enable.put(true);
    if let Some(delay) = disarm_after {
        Timer::after(delay).await;
        info!("receiver: disable");
        enable.put(false);
    }
}

/// Slides the scripted track under the sensor array, looping forever.
#[embassy_executor::task]
async fn track_task(
    script: Vec<u8>,
    segment: Duration,
) {
    for &mask in script.iter().cycle() {
        TRACK.store(mask, Ordering::Relaxed);
        debug!("track: {:#010b}", mask);
        Timer::after(segment).await;
    }
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    opts: Opts,
    config: RobotConfig,
) {
    let drive_state: &'static DriveStateCell =
        lfr_core::mk_static!(DriveStateCell, DriveStateCell::new(DriveState::default()));
    let enable: &'static EnableCell = lfr_core::mk_static!(EnableCell, EnableCell::new(false));
    let left_cmd: &'static CommandCell =
        lfr_core::mk_static!(CommandCell, CommandCell::new(MotorCommand::STOP));
    let right_cmd: &'static CommandCell =
        lfr_core::mk_static!(CommandCell, CommandCell::new(MotorCommand::STOP));

    let pins = &config.pins;
    info!(sensors = ?pins.sensors, left = ?pins.left, right = ?pins.right, "binding pins");

    let sensors = LineSensorArray::new(core::array::from_fn(|index| SimSensorPin { index }));
    let classifier =
        SensorClassifier::new(sensors, drive_state, config.timing.classify_period());
    spawner.spawn(classifier_task(classifier)).unwrap();

    let dispatcher = DriveDispatcher::new(enable, drive_state, left_cmd, right_cmd, &config);
    spawner.spawn(dispatcher_task(dispatcher)).unwrap();

    let wheels = [
        ("left", pins.left, left_cmd, &SHUTDOWN[2]),
        ("right", pins.right, right_cmd, &SHUTDOWN[3]),
    ];
    for (name, wheel_pins, cmd, shutdown) in wheels {
        let driver = PhaseEnableDriver::bind(
            TracePin {
                wheel: name,
                pin: wheel_pins.phase,
            },
            TracePwm {
                wheel: name,
                pin: wheel_pins.enable,
            },
        );
        let wheel = MotorSpeedController::new(name, driver, cmd, &config);
        spawner.spawn(motor_task(wheel, shutdown)).unwrap();
    }

    spawner
        .spawn(receiver_task(
            enable,
            Duration::from_millis(opts.arm_after_ms),
            opts.disarm_after_ms.map(Duration::from_millis),
        ))
        .unwrap();

    let script = if opts.track.is_empty() {
        DEFAULT_TRACK.to_vec()
    } else {
        opts.track
    };
    spawner
        .spawn(track_task(script, Duration::from_millis(opts.segment_ms)))
        .unwrap();

    Timer::after(Duration::from_millis(opts.run_for_ms)).await;
    info!("run time elapsed, stopping control loops");
    for signal in &SHUTDOWN {
        signal.signal(());
    }
    // Let every loop observe its stop signal and log its cycle count.
    Timer::after(Duration::from_millis(config.timing.motor_period_ms)).await;

    info!(
        state = ?drive_state.get(),
        enabled = enable.get(),
        left = left_cmd.get().value(),
        right = right_cmd.get().value(),
        "final state"
    );
    std::process::exit(0);
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let config = match load_config(&opts) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    info!(?config, "configuration loaded");

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, opts, config)).unwrap();
    });
}

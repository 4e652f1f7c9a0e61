mod session;

use std::env::var;
use std::thread;
use std::time::Duration;
use dotenv::dotenv;
use log::{debug, info, warn};
use txpad::clock::{ManualClock, MonotonicClock, TickClock};
use txpad::config::Config;
use txpad::driver::{KeyListener, KeypadDriver, KeypadTaskData};
use txpad::irq::{KeypadIrq, NoAck};
use txpad::sched::TickScheduler;
use txpad::sound::PwmBeeper;
use txpad_gpio::GpioDriver;
use txpad_gpio::GpioBias::PullUp;
use txpad_gpio::keypad::{GpioKeypad, KeyCode};
use txpad_gpio::rotenc::RotEnc;
use txpad_gpio::sim::{SimGpioDriver, SimPwmPin};
use txpad_gpio::switches::SwitchReader;
use crate::session::{Panel, Session};

/// Lines on the simulated header.
const SIM_PIN_COUNT: usize = 28;

fn parse_pin_bus<const N: usize>(pin_str: &str) -> eyre::Result<[usize; N]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Expected {} pins in {:?}", N, pin_str))
}

fn pins_from_env<const N: usize>(name: &str, default: [usize; N]) -> eyre::Result<[usize; N]> {
    match var(name) {
        Ok(pins) => parse_pin_bus(&pins),
        Err(_) => Ok(default),
    }
}

/// Stands in for the UI: logs every key event it gets.
#[derive(Debug, Default)]
struct UiLog {
    events: usize,
}

impl KeyListener for UiLog {
    fn on_key(&mut self, key: KeyCode) {
        self.events += 1;
        info!("UI <- {}", key);
    }
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("txpad simulator starting...");

    // Get pin numbers from env
    let keypad_pin_col_nos = pins_from_env("TXPAD_KEYPAD_PINS_COLS", [8, 9, 10, 11])?;
    let keypad_pin_row_nos = pins_from_env("TXPAD_KEYPAD_PINS_ROWS", [12, 13, 14])?;
    let switch_pin_nos = pins_from_env("TXPAD_SWITCH_PINS", [0, 1, 5, 6])?;
    let rotary_pin_nos = pins_from_env("TXPAD_ROTARY_PINS", [16, 17])?;
    let beeper_pwm_no: usize = match var("TXPAD_BEEPER_PIN") {
        Ok(pin) => pin.trim().parse()?,
        Err(_) => 18,
    };

    info!("Keypad @ Cols: {:?}, Rows: {:?}", keypad_pin_col_nos, keypad_pin_row_nos);
    info!("Switches @ {:?}, Encoder @ {:?}, Beeper @ {}", switch_pin_nos, rotary_pin_nos, beeper_pwm_no);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    debug!("{:?}", config);

    debug!("Initializing GPIO driver...");
    let gpio = SimGpioDriver::new(SIM_PIN_COUNT);
    debug!("{:?} initialized.", gpio);

    debug!("Initializing keypad...");
    let mut keypad_col_bus = gpio.get_pin_bus(keypad_pin_col_nos)?;
    let mut keypad_row_bus = gpio.get_pin_bus(keypad_pin_row_nos)?;
    GpioKeypad::configure(&mut *keypad_col_bus, &mut *keypad_row_bus)?;
    let keypad_col_out = keypad_col_bus.as_output()?;
    let keypad_row_in = keypad_row_bus.as_input()?;
    let keypad = GpioKeypad::new(&*keypad_col_out, &*keypad_row_in);
    keypad.rest()?;
    debug!("{:?} initialized.", keypad);

    let mut switch_bus = gpio.get_pin_bus(switch_pin_nos)?;
    SwitchReader::configure(&mut *switch_bus)?;
    let switch_in = switch_bus.as_input()?;
    let switches = SwitchReader::new(&*switch_in);

    let [rotary_a_no, rotary_b_no] = rotary_pin_nos;
    let mut rotary_a_pin = gpio.get_pin(rotary_a_no)?;
    let mut rotary_b_pin = gpio.get_pin(rotary_b_no)?;
    rotary_a_pin.set_bias(PullUp)?;
    rotary_b_pin.set_bias(PullUp)?;
    let rotary_a_in = rotary_a_pin.as_input()?;
    let rotary_b_in = rotary_b_pin.as_input()?;

    // Simulated time runs as fast as it can unless asked to follow the wall clock.
    let realtime = var("TXPAD_SIM_REALTIME").is_ok_and(|value| value == "1");
    let manual_clock = ManualClock::new(0);
    let monotonic_clock = MonotonicClock::new();
    let clock: &dyn TickClock = if realtime { &monotonic_clock } else { &manual_clock };

    let scheduler: TickScheduler<KeypadTaskData, 1> = TickScheduler::new(clock);
    let irq = KeypadIrq::new(&scheduler, RotEnc::new(&*rotary_a_in, &*rotary_b_in), &NoAck);

    let mut pwm = SimPwmPin::default();
    let beeper = PwmBeeper::new(&mut pwm, clock);

    let mut driver = KeypadDriver::new(keypad, switches, &scheduler, clock, UiLog::default(), beeper);
    driver.set_beeper(config.beeper, config.key_tone_hz);

    let mut panel = Panel::new(&gpio, keypad_pin_col_nos, keypad_pin_row_nos, switch_pin_nos, rotary_pin_nos)?;
    let mut session = Session::new();

    info!("Starting main loop...");

    loop {
        let now = clock.ticks();

        session.run_due(now, &mut panel, &irq, &mut driver)?;
        panel.poll(&irq)?;

        if let Err(e) = driver.tone_mut().update() {
            warn!("Failed to stop tone: {}", e);
        }

        while let Some((_, data)) = scheduler.take_due() {
            if let Err(e) = driver.process(data) {
                warn!("Keypad task failed: {}", e);
            }
        }

        if session.is_over(now) {
            break;
        }

        if realtime {
            thread::sleep(Duration::from_millis(1));
        } else {
            manual_clock.advance(1);
        }
    }

    info!("Session over after {} ticks, {} key events.", clock.ticks(), driver.listener().events);
    drop(driver);
    info!("Beeper sounded {} times.", pwm.starts);

    Ok(())
}

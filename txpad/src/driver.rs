//! The keypad task: debouncing, auto-repeat and the pressed-key accumulator.
//!
//! Every activation of the keypad task goes through [KeypadDriver::process]. Interrupts
//! schedule the first activation; after that the driver keeps re-arming itself while a key is
//! held, at two cadences:
//!
//! - [HOLDOFF] after an accepted event, during which bounce edges are deferred instead of
//!   sampled,
//! - [REPEAT_TIME] while a key is held, to watch for release and drive auto-repeat.
//!
//! A held key is reported once, then nothing until [REPEAT_DELAY] has passed. After that trim
//! keys repeat every [REPEAT_TIME], `SEL` turns into a single `MENU`, and every other key stays
//! silent until released.
//!
//! Encoder steps bypass the repeat rules. Every step is reported, one per activation, and steps
//! still owed ride along in [KeypadTaskData] until they are.

use std::collections::VecDeque;
use log::{debug, info, trace, warn};
use txpad_gpio::GpioResult;
use txpad_gpio::keypad::{KeyCode, Keypad};
use txpad_gpio::rotenc::RotEncDirection;
use txpad_gpio::switches::{SwitchMask, SwitchReader};
use crate::clock::{elapsed, TickClock, Ticks};
use crate::config::BeeperMode;
use crate::keys::KeySet;
use crate::sched::{Scheduler, TaskData, TaskId};
use crate::sound::ToneSink;

/// Minimum ticks between two accepted key samples.
pub const HOLDOFF: Ticks = 10;
/// Ticks a key must be held before it starts repeating.
pub const REPEAT_DELAY: Ticks = 500;
/// Ticks between repeats, and between re-checks of a held key.
pub const REPEAT_TIME: Ticks = 100;

/// Keys that auto-repeat while held.
pub const REPEATABLE: KeySet = KeySet::of(&[
    KeyCode::CH1_UP, KeyCode::CH1_DN,
    KeyCode::CH2_UP, KeyCode::CH2_DN,
    KeyCode::CH3_UP, KeyCode::CH3_DN,
    KeyCode::CH4_UP, KeyCode::CH4_DN,
]);

/// Scheduler slot of the keypad task.
pub const KEYPAD_TASK: TaskId = TaskId(0);

/// Auxiliary data of a keypad task activation: the encoder steps still owed, oldest first.
///
/// Activations raised by the key matrix carry none.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeypadTaskData {
    steps: VecDeque<RotEncDirection>,
}

impl KeypadTaskData {
    /// Steps held at most; the encoder cannot plausibly get further ahead of the task.
    pub const MAX_STEPS: usize = 32;

    pub fn step(direction: RotEncDirection) -> Self {
        KeypadTaskData { steps: VecDeque::from([direction]) }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn pop(&mut self) -> Option<RotEncDirection> {
        self.steps.pop_front()
    }
}

impl TaskData for KeypadTaskData {
    fn merge(&mut self, newer: Self) {
        for direction in newer.steps {
            if self.steps.len() >= Self::MAX_STEPS {
                warn!("Encoder step backlog full, dropping {:?}.", direction);
                continue;
            }
            self.steps.push_back(direction);
        }
    }
}

/// Receiver of accepted key events, typically the UI.
pub trait KeyListener {
    fn on_key(&mut self, key: KeyCode);
}

/// Records every key, in order.
impl KeyListener for Vec<KeyCode> {
    fn on_key(&mut self, key: KeyCode) {
        self.push(key);
    }
}

/// Mutable state of the keypad task.
#[derive(Debug, Default)]
pub struct RepeatState {
    /// Tick of the last accepted key event; `None` while idle.
    last_event_time: Option<Ticks>,
    /// Key currently in auto-repeat. Only set while `last_event_time` is.
    repeating_key: Option<KeyCode>,
    /// Keys pressed since they were last polled.
    accumulated_keys: KeySet,
}

impl RepeatState {
    pub fn last_event_time(&self) -> Option<Ticks> {
        self.last_event_time
    }

    pub fn repeating_key(&self) -> Option<KeyCode> {
        self.repeating_key
    }

    /// Forgets the key in progress. Accumulated keys stay.
    fn release(&mut self) {
        self.repeating_key = None;
        self.last_event_time = None;
    }
}

pub struct KeypadDriver<'a, K: Keypad, L: KeyListener, T: ToneSink> {
    keypad: K,
    switches: SwitchReader<'a>,
    scheduler: &'a dyn Scheduler<KeypadTaskData>,
    clock: &'a dyn TickClock,
    listener: L,
    tone: T,
    beeper: BeeperMode,
    key_tone_hz: u16,
    state: RepeatState,
}

impl<'a, K: Keypad, L: KeyListener, T: ToneSink> KeypadDriver<'a, K, L, T> {
    pub const TASK: TaskId = KEYPAD_TASK;

    /// Creates the driver in the idle state.
    ///
    /// Nothing is scheduled until an interrupt reports an edge.
    pub fn new(
        keypad: K,
        switches: SwitchReader<'a>,
        scheduler: &'a dyn Scheduler<KeypadTaskData>,
        clock: &'a dyn TickClock,
        listener: L,
        tone: T,
    ) -> Self {
        info!("Keypad driver on {:?} initialized.", keypad);
        KeypadDriver {
            keypad,
            switches,
            scheduler,
            clock,
            listener,
            tone,
            beeper: BeeperMode::default(),
            key_tone_hz: 2000,
            state: RepeatState::default(),
        }
    }

    /// Sets how key clicks sound.
    pub fn set_beeper(&mut self, mode: BeeperMode, key_tone_hz: u16) {
        self.beeper = mode;
        self.key_tone_hz = key_tone_hz;
    }

    pub fn state(&self) -> &RepeatState {
        &self.state
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    pub fn tone_mut(&mut self) -> &mut T {
        &mut self.tone
    }

    /// Runs one activation of the keypad task.
    ///
    /// `data` carries the encoder steps owed to the UI.
    pub fn process(&mut self, mut data: KeypadTaskData) -> GpioResult<()> {
        let now = self.clock.ticks();

        if let Some(last) = self.state.last_event_time {
            let since = elapsed(now, last);
            if since < HOLDOFF {
                trace!("Keypad in holdoff, re-checking in {} ticks.", HOLDOFF - since);
                self.scheduler.schedule(Self::TASK, data, HOLDOFF - since);
                return Ok(());
            }
        }

        let scanned = self.keypad.scan();
        // Driving the columns back to rest can fire the row interrupt again. Whatever it
        // scheduled is dropped, but not the encoder steps that came with it.
        if let Some(pending) = self.scheduler.deschedule(Self::TASK) {
            data.merge(pending);
        }
        let scanned = match scanned {
            Ok(scanned) => scanned,
            Err(e) => {
                if !data.is_empty() {
                    self.scheduler.schedule(Self::TASK, data, HOLDOFF);
                }
                return Err(e);
            }
        };

        if scanned.is_none() {
            self.state.release();
        }

        // A fresh press is reported before any owed step, which then waits one holdoff.
        // Otherwise the press would count as already held and never be reported.
        let fresh_press = scanned.is_some() && self.state.last_event_time.is_none();
        let step = if fresh_press { None } else { data.pop() };
        let key = match step {
            Some(RotEncDirection::Left) => Some(KeyCode::LEFT),
            Some(RotEncDirection::Right) => Some(KeyCode::RIGHT),
            None => scanned,
        };

        let Some(mut key) = key else {
            return Ok(());
        };

        // Owed steps go out one per holdoff.
        let delay = if data.is_empty() { REPEAT_TIME } else { HOLDOFF };
        self.scheduler.schedule(Self::TASK, data, delay);

        // Encoder steps are independent of the matrix and always go through.
        if let (Some(last), None) = (self.state.last_event_time, step) {
            if self.state.repeating_key.is_none() && elapsed(now, last) < REPEAT_DELAY {
                trace!("{} held, waiting for repeat delay.", key);
                return Ok(());
            }

            if key == KeyCode::SEL {
                if self.state.repeating_key.is_some() {
                    return Ok(());
                }
                self.state.repeating_key = Some(KeyCode::SEL);
                key = KeyCode::MENU;
            } else if REPEATABLE.contains(key) {
                self.state.repeating_key = Some(key);
            } else {
                trace!("{} does not repeat.", key);
                return Ok(());
            }
        }

        self.accept(key, now);
        Ok(())
    }

    fn accept(&mut self, key: KeyCode, now: Ticks) {
        debug!("Key {} at tick {}.", key, now);
        self.state.accumulated_keys.insert(key);
        self.state.last_event_time = Some(now);

        if self.beeper > BeeperMode::NoKey {
            if let Some(duration_ms) = self.beeper.key_beep_ms() {
                self.tone.play_tone(self.key_tone_hz, duration_ms);
            }
        }

        self.listener.on_key(key);
    }

    /// Polls whether `key` was pressed since the last poll for it, consuming the press.
    pub fn get_pressed(&mut self, key: KeyCode) -> bool {
        self.state.accumulated_keys.take(key)
    }

    pub fn get_switches(&self) -> GpioResult<SwitchMask> {
        self.switches.read()
    }

    /// Reads one switch; switch `0` is always on.
    pub fn get_switch(&self, id: u8) -> GpioResult<bool> {
        self.switches.get(id)
    }

    /// Abandons the key in progress so that the next activation sees a fresh press.
    pub fn cancel_repeat(&mut self) {
        self.state.release();
        if let Some(data) = self.scheduler.deschedule(Self::TASK) {
            if !data.is_empty() {
                // Owed encoder steps are not part of the repeat.
                self.scheduler.schedule(Self::TASK, data, 0);
            }
        }
        debug!("Key repeat cancelled.");
    }
}

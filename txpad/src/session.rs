//! The scripted front panel session the simulator plays.

use log::{debug, info};
use txpad::clock::Ticks;
use txpad::driver::{KeyListener, KeypadDriver};
use txpad::irq::KeypadIrq;
use txpad::sound::ToneSink;
use txpad_gpio::{GpioError, GpioResult};
use txpad_gpio::keypad::{GpioKeypad, KeyCode, Keypad, COLS, ROWS};
use txpad_gpio::rotenc::{RotEncDirection, RotEncPin};
use txpad_gpio::sim::SimGpioDriver;
use txpad_gpio::switches::SWITCH_COUNT;

#[derive(Copy, Clone, Debug)]
pub enum Action {
    Press(KeyCode),
    Release(KeyCode),
    /// One encoder detent.
    Turn(RotEncDirection),
    /// Flips a toggle switch, `0` being `SWA`.
    Switch(usize, bool),
    CancelRepeat,
    /// Asks the driver what was pressed and how the switches stand.
    Poll,
}

const SCRIPT: &[(Ticks, Action)] = &[
    // Trim held long enough to repeat.
    (100, Action::Press(KeyCode::CH1_UP)),
    (1350, Action::Release(KeyCode::CH1_UP)),
    (1400, Action::Poll),
    // Long select opens the menu.
    (1600, Action::Press(KeyCode::SEL)),
    (2600, Action::Release(KeyCode::SEL)),
    // Scroll through it.
    (2800, Action::Turn(RotEncDirection::Right)),
    (2850, Action::Turn(RotEncDirection::Right)),
    (2900, Action::Turn(RotEncDirection::Right)),
    (3000, Action::Turn(RotEncDirection::Left)),
    (3100, Action::Press(KeyCode::OK)),
    (3180, Action::Release(KeyCode::OK)),
    (3200, Action::Poll),
    (3300, Action::Switch(1, true)),
    (3400, Action::Switch(3, true)),
    (3500, Action::Switch(1, false)),
    // Trim repeat cut short by the UI.
    (3600, Action::Press(KeyCode::CH3_DN)),
    (4300, Action::CancelRepeat),
    (4600, Action::Release(KeyCode::CH3_DN)),
    (4800, Action::Press(KeyCode::CANCEL)),
    (4900, Action::Release(KeyCode::CANCEL)),
    (5000, Action::Poll),
];

/// Ticks the session keeps running after its last action.
const TAIL: Ticks = 500;

/// The simulated panel wiring: which sim line every key, switch and encoder phase sits on.
///
/// Also stands in for the edge-detecting interrupt controller by polling the row and encoder
/// lines.
#[derive(Debug)]
pub struct Panel<'a> {
    gpio: &'a SimGpioDriver,
    col_pins: [usize; COLS],
    row_pins: [usize; ROWS],
    switch_pins: [usize; SWITCH_COUNT],
    rotary_pins: [usize; 2],
    /// Level both encoder phases rest at between detents.
    detent_level: bool,
    row_levels: [bool; ROWS],
    rotary_levels: [bool; 2],
}

impl<'a> Panel<'a> {
    pub fn new(
        gpio: &'a SimGpioDriver,
        col_pins: [usize; COLS],
        row_pins: [usize; ROWS],
        switch_pins: [usize; SWITCH_COUNT],
        rotary_pins: [usize; 2],
    ) -> GpioResult<Self> {
        for pin in rotary_pins {
            gpio.set_level(pin, Some(true))?;
        }
        let mut panel = Panel {
            gpio,
            col_pins,
            row_pins,
            switch_pins,
            rotary_pins,
            detent_level: true,
            row_levels: [true; ROWS],
            rotary_levels: [true; 2],
        };
        for (level, &pin) in panel.row_levels.iter_mut().zip(&row_pins) {
            *level = gpio.level(pin)?;
        }
        Ok(panel)
    }

    /// Finds the column and row lines a key joins.
    fn contact(&self, key: KeyCode) -> GpioResult<(usize, usize)> {
        for col in 0..COLS {
            for row in 0..ROWS {
                if GpioKeypad::key_at(col, row) == Some(key) {
                    return Ok((self.col_pins[col], self.row_pins[row]));
                }
            }
        }
        Err(GpioError::InvalidArgument)
    }

    pub fn press(&self, key: KeyCode) -> GpioResult<()> {
        let (col, row) = self.contact(key)?;
        self.gpio.close_contact(col, row);
        Ok(())
    }

    pub fn release(&self, key: KeyCode) -> GpioResult<()> {
        let (col, row) = self.contact(key)?;
        self.gpio.open_contact(col, row);
        Ok(())
    }

    /// Switches close to ground when on.
    pub fn set_switch(&self, index: usize, on: bool) -> GpioResult<()> {
        let pin = *self.switch_pins.get(index).ok_or(GpioError::InvalidArgument)?;
        self.gpio.set_level(pin, if on { Some(false) } else { None })
    }

    /// Moves the encoder one detent. The phase that changes first tells the direction.
    pub fn turn(&mut self, direction: RotEncDirection, irq: &KeypadIrq) -> GpioResult<()> {
        let (lead, follow) = match direction {
            RotEncDirection::Right => (1, 0),
            RotEncDirection::Left => (0, 1),
        };
        self.detent_level = !self.detent_level;
        for phase in [lead, follow] {
            self.gpio.set_level(self.rotary_pins[phase], Some(self.detent_level))?;
            self.poll(irq)?;
        }
        Ok(())
    }

    /// Raises the interrupts for any edges since the last poll: falling edges on the rows, any
    /// edge on the encoder.
    pub fn poll(&mut self, irq: &KeypadIrq) -> GpioResult<()> {
        for (last, &pin) in self.row_levels.iter_mut().zip(&self.row_pins) {
            let level = self.gpio.level(pin)?;
            if *last && !level {
                irq.on_keypad_edge();
            }
            *last = level;
        }

        for (phase, (last, &pin)) in self.rotary_levels.iter_mut().zip(&self.rotary_pins).enumerate() {
            let level = self.gpio.level(pin)?;
            if *last != level {
                irq.on_rotary_edge(if phase == 0 { RotEncPin::A } else { RotEncPin::B });
            }
            *last = level;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Session {
    next: usize,
}

impl Session {
    pub fn new() -> Self {
        Session { next: 0 }
    }

    /// Whether the script has played out, tail included.
    pub fn is_over(&self, now: Ticks) -> bool {
        let last = SCRIPT.last().map_or(0, |&(at, _)| at);
        self.next >= SCRIPT.len() && now >= last + TAIL
    }

    /// Performs every action due by `now`.
    pub fn run_due<K: Keypad, L: KeyListener, T: ToneSink>(
        &mut self,
        now: Ticks,
        panel: &mut Panel,
        irq: &KeypadIrq,
        driver: &mut KeypadDriver<'_, K, L, T>,
    ) -> GpioResult<()> {
        while let Some(&(at, action)) = SCRIPT.get(self.next) {
            if at > now {
                break;
            }
            self.next += 1;
            debug!("Tick {}: {:?}", now, action);
            match action {
                Action::Press(key) => panel.press(key)?,
                Action::Release(key) => panel.release(key)?,
                Action::Turn(direction) => panel.turn(direction, irq)?,
                Action::Switch(index, on) => {
                    panel.set_switch(index, on)?;
                    info!("Switches now {:?}", driver.get_switches()?);
                }
                Action::CancelRepeat => driver.cancel_repeat(),
                Action::Poll => Self::poll(driver)?,
            }
        }
        Ok(())
    }

    fn poll<K: Keypad, L: KeyListener, T: ToneSink>(driver: &mut KeypadDriver<'_, K, L, T>) -> GpioResult<()> {
        let pressed: Vec<KeyCode> = KeyCode::ALL
            .into_iter()
            .filter(|&key| driver.get_pressed(key))
            .collect();
        info!("Pressed since last poll: {:?}", pressed);

        let switches = (0..=4)
            .map(|id| driver.get_switch(id))
            .collect::<GpioResult<Vec<_>>>()?;
        info!("Switch states 0-4: {:?}", switches);
        Ok(())
    }
}

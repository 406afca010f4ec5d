//! `StepperIO` and `Delay` on top of embedded-hal 1.0 pins and delays.

use crate::hal::{Level, Line, StepperIO};
use crate::timebase::Delay;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// The four driver lines as GPIO outputs.
///
/// Pins are handed over already configured as push-pull outputs, so
/// `configure_output` has nothing left to do.
pub struct PinBank<EN, HF, CLK, DIR> {
    enable: EN,
    half_full: HF,
    clock: CLK,
    direction: DIR,
}

impl<EN, HF, CLK, DIR> PinBank<EN, HF, CLK, DIR>
where
    EN: OutputPin<Error = Infallible>,
    HF: OutputPin<Error = Infallible>,
    CLK: OutputPin<Error = Infallible>,
    DIR: OutputPin<Error = Infallible>,
{
    pub fn new(enable: EN, half_full: HF, clock: CLK, direction: DIR) -> Self {
        Self {
            enable,
            half_full,
            clock,
            direction,
        }
    }

    pub fn release(self) -> (EN, HF, CLK, DIR) {
        (self.enable, self.half_full, self.clock, self.direction)
    }
}

fn drive<P: OutputPin<Error = Infallible>>(pin: &mut P, level: Level) {
    let result = match level {
        Level::High => pin.set_high(),
        Level::Low => pin.set_low(),
    };
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl<EN, HF, CLK, DIR> StepperIO for PinBank<EN, HF, CLK, DIR>
where
    EN: OutputPin<Error = Infallible>,
    HF: OutputPin<Error = Infallible>,
    CLK: OutputPin<Error = Infallible>,
    DIR: OutputPin<Error = Infallible>,
{
    fn configure_output(&mut self, _line: Line) {}

    fn set_level(&mut self, line: Line, level: Level) {
        match line {
            Line::Enable => drive(&mut self.enable, level),
            Line::HalfFull => drive(&mut self.half_full, level),
            Line::Clock => drive(&mut self.clock, level),
            Line::Direction => drive(&mut self.direction, level),
        }
    }
}

pub struct HalDelay<D>(pub D);

impl<D: DelayNs> Delay for HalDelay<D> {
    fn delay_us(&mut self, us: u32) {
        self.0.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct FakePin(Rc<Cell<bool>>);

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.set(true);
            Ok(())
        }
    }

    struct CountingDelay(u32);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns;
        }
    }

    #[test]
    fn routes_lines_to_their_pins() {
        let cells: Vec<Rc<Cell<bool>>> = (0..4).map(|_| Rc::new(Cell::new(false))).collect();
        let mut bank = PinBank::new(
            FakePin(cells[0].clone()),
            FakePin(cells[1].clone()),
            FakePin(cells[2].clone()),
            FakePin(cells[3].clone()),
        );

        bank.assert(Line::Clock);
        bank.assert(Line::Direction);
        assert!(!cells[0].get());
        assert!(!cells[1].get());
        assert!(cells[2].get());
        assert!(cells[3].get());

        bank.deassert(Line::Direction);
        assert!(!cells[3].get());

        let (enable, _, clock, direction) = bank.release();
        assert!(Rc::ptr_eq(&enable.0, &cells[0]));
        assert!(clock.0.get());
        assert!(!direction.0.get());
    }

    #[test]
    fn hal_delay_forwards_microseconds() {
        let mut delay = HalDelay(CountingDelay(0));
        delay.delay_us(3);
        assert_eq!(delay.0 .0, 3_000);
    }
}

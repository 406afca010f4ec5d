pub mod control_loop;
pub mod error;
pub mod frame;
pub mod hal;
pub mod hal_pins;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod motor;
pub mod timebase;

pub use control_loop::{ControlConfig, Event, GaugeLoop, GaugeState, LoopStats};
pub use error::{FrameError, GaugeError};
pub use frame::{parse_reading, FrameAccumulator};
pub use hal::{Level, Line, RxErrors, RxPoll, SerialPort, StepperIO};
pub use hal_pins::{HalDelay, PinBank};
#[cfg(feature = "simulation")]
pub use hal_sim::{ScriptedSerial, SimulatedStepper};
pub use motor::{Direction, MotorDriver};
pub use timebase::{Delay, SpinDelay, TimeBase, VirtualClock};

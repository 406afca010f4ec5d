use gauge_core::{
    ControlConfig, GaugeLoop, RxPoll, SerialPort, SimulatedStepper, VirtualClock,
};
use gauge_io::link::{OverflowPolicy, StreamLink};
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for_eof<W: std::io::Write>(link: &StreamLink<W>) {
    let start = Instant::now();
    while !link.input_closed() {
        assert!(start.elapsed() < Duration::from_secs(5), "reader never hit EOF");
        thread::sleep(Duration::from_millis(1));
    }
}

fn drain<W: std::io::Write>(link: &mut StreamLink<W>) -> Vec<RxPoll> {
    let start = Instant::now();
    let mut polled = Vec::new();
    while link.is_open() {
        assert!(start.elapsed() < Duration::from_secs(5), "link never closed");
        match link.poll() {
            RxPoll::NoData => thread::yield_now(),
            byte => polled.push(byte),
        }
    }
    polled
}

#[test]
fn blocking_link_delivers_every_byte_in_order() {
    let input = b"12!34!56!78!90!".to_vec();
    let mut link =
        StreamLink::spawn(Cursor::new(input.clone()), Vec::new(), 4, OverflowPolicy::Block)
            .expect("link should start");

    let received: Vec<u8> = drain(&mut link)
        .into_iter()
        .map(|poll| match poll {
            RxPoll::Byte { byte, errors } => {
                assert!(!errors.any());
                byte
            }
            RxPoll::NoData => unreachable!(),
        })
        .collect();
    assert_eq!(received, input);

    link.write(b"12!").expect("write to sink");
    assert_eq!(link.into_writer(), b"12!".to_vec());
}

#[test]
fn dropping_link_flags_overflow_on_next_byte() {
    let mut link = StreamLink::spawn(
        Cursor::new(b"0123456789".to_vec()),
        Vec::new(),
        4,
        OverflowPolicy::Drop,
    )
    .expect("link should start");
    wait_for_eof(&link);
    assert_eq!(link.buffered(), 4);

    let polled = drain(&mut link);
    assert_eq!(polled.len(), 4);
    match polled[0] {
        RxPoll::Byte { byte, errors } => {
            assert_eq!(byte, b'0');
            assert!(errors.buffer_overflow);
            assert!(!errors.frame && !errors.overrun);
        }
        RxPoll::NoData => panic!("expected a byte"),
    }
    assert!(matches!(polled[1], RxPoll::Byte { errors, .. } if !errors.any()));
}

#[test]
fn zero_capacity_is_rejected() {
    let result = StreamLink::spawn(Cursor::new(Vec::new()), Vec::new(), 0, OverflowPolicy::Block);
    assert!(result.is_err());
}

#[test]
fn gauge_loop_runs_over_stream_link() {
    let link = StreamLink::spawn(
        Cursor::new(b"50!75!75!20!#".to_vec()),
        Vec::new(),
        gauge_io::DEFAULT_RX_BUFFER,
        OverflowPolicy::Block,
    )
    .expect("link should start");

    let mut gauge = GaugeLoop::new(
        link,
        SimulatedStepper::new(),
        VirtualClock::new(),
        ControlConfig::default(),
    );
    let stop = AtomicBool::new(false);
    gauge.run(&stop).expect("loop should finish cleanly");

    assert_eq!(gauge.serial().writer().as_slice(), b"50!25!0!-55!");
    assert_eq!(gauge.state().reading, 0);
    assert_eq!(gauge.motor().io().position_half_steps(), 0);
    assert_eq!(gauge.stats().frames_completed, 4);
}

use faces_input::face::gamepad::DEFAULT_HOLD_MS;
use faces_input::link::{LinkError, SampleSlot};
use faces_input::prelude::*;

fn started<T: PollableInput>(mut face: T) -> T {
    assert!(face.begin());
    face
}

#[test]
fn keyboard_cr_lf_yields_one_line_feed() {
    let mut kbd = started(Keyboard::new(ScriptedLink::new()));
    kbd.link_mut().push_bytes(&[0x0D, 0x0A]);

    let mut events = Vec::new();
    for _ in 0..2 {
        kbd.update();
        if kbd.available() {
            events.push(kbd.raw());
        }
    }
    assert_eq!(events, vec![0x0A]);
}

#[test]
fn keyboard_stale_bytes_never_surface() {
    let mut link = ScriptedLink::new();
    link.push_bytes(b"garbage").push_idle().push_byte(b'x');
    let mut kbd = Keyboard::new(link);

    assert!(kbd.begin());
    kbd.update();
    assert_eq!(kbd.key(), Some(Key::Char('x')));
}

#[test]
fn calculator_decodes_function_digit_and_rejects_garbage() {
    let mut calc = started(Calculator::new(ScriptedLink::new()));
    calc.link_mut().push_bytes(&[b'+', b'5', 0x01]);

    calc.update();
    assert!(calc.available());
    assert!(calc.is_function());
    assert_eq!(calc.input(), Some(CalcInput::Function(CalcFunction::Add)));

    calc.update();
    assert!(calc.available());
    assert!(!calc.is_function());
    assert_eq!(calc.now(), 5);

    calc.update();
    assert!(!calc.available());
    assert_eq!(calc.input(), None);
}

#[test]
fn absent_peripheral_keeps_polling_a_noop() {
    let mut pad = Gamepad::new(ScriptedLink::absent());
    assert!(!pad.begin());

    pad.link_mut().push_bitmask(0x01);
    pad.update_at(0);
    assert!(!pad.available());
    assert!(!pad.is_pressed(Buttons::ALL));
}

#[test]
fn gamepad_up_scenario() {
    let mut pad = started(Gamepad::new(ScriptedLink::new()));
    pad.set_hold_threshold(Button::Up, 100);

    pad.link_mut().push_bitmask(0x01);
    pad.update_at(0);
    assert_eq!(pad.edge().bits(), 0x01);
    assert_eq!(pad.hold().bits(), 0x00);

    pad.link_mut().push_bitmask(0x01);
    pad.update_at(100);
    assert_eq!(pad.hold_edge().bits(), 0x01);

    pad.link_mut().push_bitmask(0x00);
    pad.update_at(150);
    assert_eq!(pad.release_edge().bits(), 0x01);
    assert_eq!(pad.now().bits(), 0x00);
    assert_eq!(pad.hold().bits(), 0x00);
}

// Small deterministic generator so the sequence test needs no extra crates.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 >> 8
    }
}

#[test]
fn gamepad_invariants_hold_over_random_polls() {
    let mut pad = started(Gamepad::new(ScriptedLink::new()));
    let mut rng = Lcg(7);
    let mut press_start = [None::<u64>; Button::COUNT];
    let mut hold_edges = [0usize; Button::COUNT];
    let mut t = 0u64;

    for _ in 0..2000 {
        t += 5 + u64::from(rng.next() % 30);
        if rng.next() % 4 == 0 {
            // Mostly leave buttons alone so holds can develop.
            pad.link_mut().push_bitmask((rng.next() & 0xFF) as u8);
        } else {
            pad.link_mut().push_idle();
        }

        let before = pad.now();
        pad.update_at(t);
        let report = pad.report();

        assert_eq!(report.last, before);
        for button in Button::ALL {
            let bit = button.mask();
            let i = button.index();
            let was = report.last.contains(bit);
            let is = report.now.contains(bit);

            assert_eq!(report.edge.contains(bit), !was && is);
            assert_eq!(report.release_edge.contains(bit), was && !is);

            if report.edge.contains(bit) {
                press_start[i] = Some(t);
                hold_edges[i] = 0;
            }
            if !is {
                press_start[i] = None;
                assert!(!report.hold.contains(bit));
                assert!(!report.repeat.contains(bit));
                continue;
            }

            let held_for = t - press_start[i].expect("pressed button has a start");
            assert_eq!(report.hold.contains(bit), held_for >= DEFAULT_HOLD_MS);
            if report.hold_edge.contains(bit) {
                hold_edges[i] += 1;
                assert_eq!(hold_edges[i], 1);
            }
            if !pad.is_repeat_enabled(button) {
                assert!(!report.repeat.contains(bit));
            }
        }
    }
}

// Event-driven transport: a producer thread parks snapshots in a single slot.
#[derive(Debug)]
struct SlotLink {
    slot: SampleSlot<u8>,
}

impl PeripheralLink for SlotLink {
    fn probe(&mut self) -> Result<bool, LinkError> {
        Ok(true)
    }

    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        Err(LinkError::Unsupported(faces_input::link::SampleKind::Byte))
    }

    fn poll_bitmask(&mut self) -> Result<Option<u8>, LinkError> {
        Ok(self.slot.take())
    }
}

#[test]
fn event_driven_link_keeps_only_latest_snapshot() {
    let slot = SampleSlot::new();
    let mut pad = started(Gamepad::new(SlotLink { slot: slot.clone() }));

    let producer = slot.clone();
    std::thread::spawn(move || {
        producer.offer(0x01);
        producer.offer(0x03);
        producer.offer(0x02);
    })
    .join()
    .unwrap();

    pad.update_at(0);
    assert_eq!(pad.now(), Buttons::DOWN);
    assert_eq!(pad.edge(), Buttons::DOWN);

    pad.update_at(16);
    assert!(!pad.available());
    assert_eq!(pad.now(), Buttons::DOWN);
}

#[test]
fn faces_variant_runs_every_kind() {
    for kind in [FaceKind::Keyboard, FaceKind::Calculator, FaceKind::Gamepad] {
        let mut faces = Faces::new(kind, ScriptedLink::new());
        assert!(faces.begin());
        faces.update();
        assert!(!faces.available());
        assert_eq!(faces.event(), None);
    }
}

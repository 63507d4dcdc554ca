// End-to-end tests: framing, devices, polling and decoding working together
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Duration;
use therma_decoder::{
    parse_definitions_file, poll_once, serial_table, DecodeEngine, Device, Framer, FramerLink,
    FramerState, LinkDevice, SimulatedDevice, Value,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_definitions() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/altherma_sample.h")
}

fn canned_commands() -> Vec<Vec<u8>> {
    SimulatedDevice::with_seed(0)
        .commands()
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect()
}

fn passthrough(seed: u64) -> LinkDevice<FramerLink<SimulatedDevice>> {
    let link = FramerLink::new(Framer::new(SimulatedDevice::with_seed(seed)));
    LinkDevice::new(link, Duration::from_millis(200), Duration::from_millis(20))
}

/// Write `bytes` to the framer in random chunks of 1 to 4 bytes
fn write_chunked<D: Device>(framer: &mut Framer<D>, bytes: &[u8], rng: &mut StdRng) {
    let mut rest = bytes;
    while !rest.is_empty() {
        let size = rng.gen_range(1..=4).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        framer.write(chunk).unwrap();
        rest = tail;
    }
}

#[test]
fn test_chunked_requests_get_canned_responses() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut framer = Framer::new(SimulatedDevice::with_seed(1));
    assert_eq!(canned_commands().len(), 19);

    for _ in 0..20 {
        for command in canned_commands() {
            write_chunked(&mut framer, &command, &mut rng);
            let response = framer.read();

            let known: Vec<&[u8]> = therma_decoder::simulator::CANNED_RESPONSES
                .iter()
                .filter(|(c, _)| *c == command.as_slice())
                .map(|(_, r)| *r)
                .collect();
            assert!(
                known.contains(&response.as_slice()),
                "unexpected response {:?} to {:?}",
                response,
                command
            );
            assert_eq!(framer.state(), FramerState::AwaitingRequest);
        }
    }
}

#[test]
fn test_back_to_back_requests_in_one_write() {
    let mut framer = Framer::new(SimulatedDevice::with_seed(3));
    let mut stream = vec![3, 64, 17, 171];
    stream.extend_from_slice(&[3, 64, 33, 155]);
    stream.extend_from_slice(&[2, 80]);

    assert_eq!(framer.write(&stream).unwrap(), 1);
    let responses = framer.read();
    assert_eq!(&responses[..10], &[64, 17, 8, 2, 49, 149, 1, 2, 5, 214]);
    assert_eq!(&responses[10..12], &[64, 33]);
    assert_eq!(responses.len(), 10 + 20);

    assert_eq!(framer.write(&[173]).unwrap(), 0);
    assert_eq!(framer.read(), vec![21, 234]);
}

#[test]
fn test_passthrough_matches_direct_device() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(11);
    let mut direct = Framer::new(SimulatedDevice::with_seed(5));
    let mut relayed = Framer::new(passthrough(5));

    for command in canned_commands() {
        write_chunked(&mut direct, &command, &mut rng);
        write_chunked(&mut relayed, &command, &mut rng);
        assert_eq!(relayed.read(), direct.read(), "response to {:?}", command);
    }
}

#[test]
fn test_poll_serial_table_through_passthrough() {
    let mut device = passthrough(9);
    let record = poll_once(&mut device, serial_table()).unwrap();

    assert_eq!(record.raw_contents.len(), 11);
    assert_eq!(record.variable_values["21"], serde_json::json!(6.0));
    assert_eq!(record.variable_values["135"], serde_json::json!("DHW"));
    assert_eq!(record.variable_values["175"], serde_json::json!(-0.3));
}

#[test]
fn test_poll_imported_definitions() {
    init_logging();
    let table = parse_definitions_file(&sample_definitions()).unwrap();
    assert!(table.validate().is_ok());

    let stats = table.stats();
    assert_eq!(stats.num_prefixes, 7);
    assert_eq!(stats.num_decoders, 8);

    let mut device = SimulatedDevice::with_seed(2);
    let record = poll_once(&mut device, &table).unwrap();

    let values = &record.variable_values;
    assert_eq!(values["0.12.105"], serde_json::json!(6.0));
    assert_eq!(values["0.0.152"], serde_json::json!(4));
    assert_eq!(values["16.0.217"], serde_json::json!("Fan Only"));
    assert_eq!(values["16.1.307"], serde_json::json!(false));
    assert_eq!(values["17.0.152"], serde_json::json!(2));
    assert_eq!(values["32.0.105"], serde_json::json!(20.5));
    assert_eq!(values["96.2.315"], serde_json::json!("DHW"));
    assert_eq!(values["98.9.105"], serde_json::json!(-0.3));
    assert!(!values.contains_key("0.11.100"));

    // skipped conversions still get their page read
    assert!(record.raw_contents.contains_key("33"));
    assert_eq!(record.raw_contents["0"].len(), 13);
}

#[test]
fn test_decode_single_exchange() {
    let table = parse_definitions_file(&sample_definitions()).unwrap();
    let result = DecodeEngine::decode(
        &[3, 64, 0, 188],
        &[64, 0, 15, 4, 1, 0, 1, 1, 1, 0, 2, 1, 1, 4, 57, 60, 43],
        &table,
    );
    assert_eq!(result.len(), 2);
    assert_eq!(result.value("0.12.105"), Some(Value::Float(6.0)));
    assert_eq!(result.value("0.0.152"), Some(Value::Integer(4)));
}

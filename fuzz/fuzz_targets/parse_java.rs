#![no_main]

use std::sync::OnceLock;
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use nova_syntax::{parse, print_compilation_unit, FileId};

mod utils;

fn run_one(input: &str) {
    // Parsing never fails, and whatever was parsed must print and parse again.
    let unit = parse(FileId::new("Fuzz.java"), input);
    let printed = print_compilation_unit(&unit);
    let _ = parse(FileId::new("Fuzz.java"), &printed);
}

fn worker() -> &'static utils::Worker {
    static WORKER: OnceLock<utils::Worker> = OnceLock::new();
    WORKER.get_or_init(|| utils::Worker::spawn("parse_java", Duration::from_secs(2), run_one))
}

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };
    worker().run(text);
});

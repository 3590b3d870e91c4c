#![no_main]

use std::sync::OnceLock;
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use nova_delegate::{
    analyze_conflicts, eligible_base_types, preview, scan, DelegationConfig, DelegationPolicy,
    DelegationTarget,
};
use nova_hir::Program;
use nova_syntax::Workspace;

mod utils;

fn run_one(input: &str) {
    let workspace = Workspace::from_sources([("Fuzz.java", input)]);
    let program = Program::build(&workspace);

    // Conversions are expected to fail on most inputs; they must never panic.
    for (host, _, _) in program.type_decls() {
        for base in eligible_base_types(&program, host) {
            let Ok(target) = DelegationTarget::resolve(&program, host, base) else {
                continue;
            };
            let records = scan(&program, &target);
            for policy in [DelegationPolicy::Strict, DelegationPolicy::AutoForward] {
                let config = DelegationConfig {
                    policy,
                    ..DelegationConfig::default()
                };
                let Ok(naming) = config.naming_for(program.symbol(base).name()) else {
                    continue;
                };
                let mut surface = config.surface();
                if let Some(member) = target.surface.methods().find(|member| !member.is_static) {
                    surface = surface.forward(member.symbol);
                }
                let _ = analyze_conflicts(&program, &target, &records, &surface);
                let _ = preview(&workspace, &program, &target, &records, &surface, &naming);
            }
        }
    }
}

fn worker() -> &'static utils::Worker {
    static WORKER: OnceLock<utils::Worker> = OnceLock::new();
    WORKER.get_or_init(|| utils::Worker::spawn("delegate_smoke", Duration::from_secs(5), run_one))
}

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };
    worker().run(text);
});

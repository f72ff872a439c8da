#![no_main]

use libfuzzer_sys::fuzz_target;
extern crate btc_script;

use btc_script::{
    interpreter::{CallbackSignatureChecker, Flags},
    script, testing, CltvExtension, P2shExtension, Program, ScriptInterpreter,
};

fn missing_sighash(_script_code: &script::Code, _hash_type: u8) -> Option<[u8; 32]> {
    None
}

fuzz_target!(|tup: (u32, bool, &[u8], &[u8], u32)| {
    // `fuzz_target!` doesn’t support pattern matching in the parameter list.
    let (lock_time, is_final, pub_key, sig, flag_bits) = tup;
    let flags = testing::repair_flags(Flags::from_bits_truncate(flag_bits));
    let checker = CallbackSignatureChecker {
        sighash: &missing_sighash,
        lock_time: lock_time.into(),
        is_final,
    };
    let (Ok(sig), Ok(pub_key)) = (Program::parse(sig), Program::parse(pub_key)) else {
        return;
    };

    let built_in = ScriptInterpreter::new(flags, &checker).verify(&sig, &pub_key);

    // The extensions have to produce the same result as the flags they stand in for.
    let extended_flags = Flags::P2SH | Flags::CHECKLOCKTIMEVERIFY;
    if flags.contains(extended_flags) {
        let extended = ScriptInterpreter::new(flags - extended_flags, &checker)
            .with_extension(Box::new(P2shExtension::new()))
            .with_extension(Box::new(CltvExtension::new(&checker)))
            .verify(&sig, &pub_key);
        assert_eq!(
            built_in.as_ref().map_err(|e| e.kind()),
            extended.as_ref().map_err(|e| e.kind()),
            "built-in result: {:?}",
            built_in
        );
    }
});

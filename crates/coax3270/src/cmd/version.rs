use coax3270::engine::{DEFAULT_MAX_FRAME_WORDS, DEFAULT_TIMEOUT};
use coax3270::signal::{BIT_RATE, TICKS_PER_BIT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("coax3270 {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: coax3270");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("COAX3270_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("bit_rate: {BIT_RATE}");
    println!("ticks_per_bit: {TICKS_PER_BIT}");
    println!("max_frame_words: {DEFAULT_MAX_FRAME_WORDS}");
    println!("default_timeout_ms: {}", DEFAULT_TIMEOUT.as_millis());
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}

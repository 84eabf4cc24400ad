pub mod codecs;
pub mod command;
pub mod containers;
pub mod dialog;
pub mod error;
pub mod ffmpeg;
pub mod fstools;
pub mod permission;
pub mod progress;
pub mod session;
pub mod storage;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};

use chrono::Utc;
use human_repr::HumanCount;
use rustop::opts;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use codecs::Codec;
use ffmpeg::engine::FFmpegEngine;
use ffmpeg::return_code::Outcome;
use permission::{check_access, check_permission, TerminalPrompt};
use session::CompressSession;
use storage::reference_path;

fn main() -> ExitCode {
    let (args, _rest) = opts! {
        synopsis "Compress a video with ffmpeg using one of a fixed set of codecs.";
        opt codec:String=String::from("x264"), desc:"Video codec. [x264, openh264, x265, xvid, vp8, vp9, aom, kvazaar, theora, hap]";
        opt output_dir:Option<String>, desc:"Directory for compressed videos. (default: ~/Movies/compress-video)";
        opt name:Option<String>, desc:"Output file name without extension. (default: compress_<epoch millis>)";
        opt dry_run:bool=false, desc:"Print the ffmpeg command instead of running it.";
        opt list_codecs:bool=false, desc:"List the codec choices and exit.";
        opt verbose:bool=false, desc:"Log debug output.";
        param input:Option<String>, desc:"Video file path or file:// reference";
    }.parse_or_exit();

    init_logging(args.verbose);

    if args.list_codecs {
        for codec in Codec::ALL {
            let profile = codec.profile();
            println!("{:<9} {:<12} {:<5} {}", codec.label(), profile.encoder, profile.extension, profile.options);
        }
        return ExitCode::SUCCESS;
    }

    let Some(input) = args.input else {
        println!("No input video given.");
        return ExitCode::FAILURE;
    };

    let codec = Codec::from_label(&args.codec);
    if let Codec::Unknown(label) = &codec {
        warn!("Unknown codec {:?}; ffmpeg defaults will be used.", label);
    }
    let output_dir = args.output_dir.map(PathBuf::from).unwrap_or_else(default_output_dir);
    let name = args.name.unwrap_or_else(|| format!("compress_{}", Utc::now().timestamp_millis()));

    let f = ffmpeg::FFmpeg::new();
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let engine = FFmpegEngine::new(f.binary().to_path_buf(), tx, Arc::clone(&stop));
    let mut session = CompressSession::new(Box::new(engine), rx, output_dir.clone()).codec(codec);

    if args.dry_run {
        println!("ffmpeg {}", session.compose_command(&input, &name).as_str());
        return ExitCode::SUCCESS;
    }

    if !f.is_installed() {
        println!("ffmpeg is not installed.");
        return ExitCode::FAILURE;
    }

    let source = reference_path(&input);
    let started = check_permission(
        &mut TerminalPrompt,
        || check_access(&source, &output_dir),
        || session.compress(&input, &name),
    );

    match started {
        None => {
            println!("Storage permission was not granted.");
            ExitCode::FAILURE
        },
        Some(Err(err)) => {
            println!("Failure -__-\n{}", err);
            ExitCode::FAILURE
        },
        Some(Ok(None)) => ExitCode::FAILURE,
        Some(Ok(Some(execution_id))) => {
            debug!("waiting for execution {}", execution_id);
            watch_signals(&stop);
            let destination = session.job().map(|job| job.destination.clone());
            match session.wait_for_outcome() {
                Some(Outcome::Success) => {
                    if let Some(path) = destination {
                        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                        println!("Success! ^__^ {} ({})", path.display(), size.human_count_bytes());
                    }
                    ExitCode::SUCCESS
                },
                Some(outcome) => {
                    println!("Failure -__-\n{}", outcome);
                    ExitCode::FAILURE
                },
                None => ExitCode::FAILURE,
            }
        },
    }
}

/// The first SIGINT/SIGTERM cancels the running job; a second one while the
/// flag is still raised terminates the process.
fn watch_signals(stop: &Arc<AtomicBool>) {
    for signal in [SIGINT, SIGTERM] {
        let registered = signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(stop))
            .and_then(|_| signal_hook::flag::register(signal, Arc::clone(stop)));
        if let Err(err) = registered {
            warn!("Unable to register handler for signal {}: {}", signal, err);
        }
    }
}

fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("compress_video=debug,ffmpeg=warn")
        } else {
            EnvFilter::new("compress_video=warn,ffmpeg=error")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_output_dir() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join("Movies").join("compress-video"),
        None => PathBuf::from("compress-video"),
    }
}

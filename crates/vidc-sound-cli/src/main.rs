//! VIDC sound pipeline demo player
//!
//! Drives the emulated sound DMA engine from a synthesised machine: fills
//! the double-buffered DMA region with a log-encoded test tone (or a raw
//! sample file), pumps the event queue in step with the wall clock, and
//! plays the resampled output through the system audio device or renders
//! it to a WAV file.

mod args;
mod machine;

use args::CliArgs;
use machine::{DemoMachine, Feed};
use std::time::{Duration, Instant};
use vidc_sound::{ActiveDevice, SoundPipeline, StreamConfig, StreamSink, WavSink};

fn main() {
    let args = CliArgs::parse();
    if args.show_help {
        CliArgs::print_help();
        return;
    }
    if let Err(err) = run(args) {
        eprintln!("vidc-player: {err}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> vidc_sound::Result<()> {
    let tick_rate = DemoMachine::tick_rate(args.sound_freq);
    let feed = match &args.input {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            println!("Playing {} ({} log samples)", path, bytes.len());
            Feed::raw(bytes)
        }
        None => {
            println!(
                "Playing a {:.0}Hz test tone ({:.0} source ticks/s)",
                args.tone_hz, tick_rate
            );
            Feed::tone(args.tone_hz, tick_rate)
        }
    };

    let mut machine = DemoMachine::new(args.sound_freq, feed);
    let mut sound = ActiveDevice::new();

    match &args.wav_output {
        Some(path) => {
            let sink = WavSink::create(path, args.sample_rate)?;
            sound.set(
                &mut machine.hw,
                &mut machine.queue,
                0,
                Some(Box::new(SoundPipeline::new(sink))),
            )?;

            // Offline render: no pacing, just run the emulated clock.
            let end = args.seconds as u64 * machine.emu_rate() as u64;
            machine.run_until(&mut sound, end);
            sound.set(&mut machine.hw, &mut machine.queue, end, None)?;
            println!("Wrote {path}");
        }
        None => {
            let sink = StreamSink::new(StreamConfig::stable(args.sample_rate));
            sound.set(
                &mut machine.hw,
                &mut machine.queue,
                0,
                Some(Box::new(SoundPipeline::new(sink))),
            )?;

            // Pace the emulated clock against the wall clock so the
            // stream ring neither starves nor floods.
            let start = Instant::now();
            let total = Duration::from_secs(args.seconds as u64);
            while start.elapsed() < total {
                let target = (start.elapsed().as_secs_f64() * machine.emu_rate() as f64) as u64;
                machine.run_until(&mut sound, target);
                std::thread::sleep(Duration::from_millis(5));
            }
            // Let the tail of the ring drain before tearing down.
            std::thread::sleep(Duration::from_millis(200));
            let end = (start.elapsed().as_secs_f64() * machine.emu_rate() as f64) as u64;
            sound.set(&mut machine.hw, &mut machine.queue, end, None)?;
        }
    }

    Ok(())
}

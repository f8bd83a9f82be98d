//! Command-line argument parsing for the VIDC sound demo player.

use std::env;

/// Parsed command-line arguments.
#[derive(Debug)]
pub struct CliArgs {
    /// Raw log-sample file to play instead of the built-in tone
    pub input: Option<String>,
    /// Write a WAV file here instead of playing through the audio device
    pub wav_output: Option<String>,
    /// Playback duration in seconds
    pub seconds: u32,
    /// Built-in tone frequency in Hz
    pub tone_hz: f64,
    /// VIDC sound frequency register value
    pub sound_freq: u8,
    /// Host sample rate in Hz
    pub sample_rate: u32,
    /// Whether help was requested
    pub show_help: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            input: None,
            wav_output: None,
            seconds: 5,
            tone_hz: 440.0,
            sound_freq: 38,
            sample_rate: 44_100,
            show_help: false,
        }
    }
}

impl CliArgs {
    /// Parse arguments from the command line.
    pub fn parse() -> Self {
        let mut args = Self::default();
        let mut iter = env::args().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => {
                    args.show_help = true;
                }
                "--wav" => match iter.next() {
                    Some(path) => args.wav_output = Some(path),
                    None => {
                        eprintln!("--wav requires a file path");
                        args.show_help = true;
                    }
                },
                "--seconds" => {
                    args.seconds = Self::numeric(&mut iter, "--seconds", &mut args.show_help);
                }
                "--tone" => {
                    args.tone_hz = Self::numeric(&mut iter, "--tone", &mut args.show_help);
                }
                "--freq" => {
                    args.sound_freq = Self::numeric(&mut iter, "--freq", &mut args.show_help);
                }
                "--rate" => {
                    args.sample_rate = Self::numeric(&mut iter, "--rate", &mut args.show_help);
                }
                _ if arg.starts_with('-') => {
                    eprintln!("Unknown flag: {arg}");
                    args.show_help = true;
                }
                _ => {
                    args.input = Some(arg);
                }
            }
        }

        args
    }

    fn numeric<T: std::str::FromStr + Default>(
        iter: &mut impl Iterator<Item = String>,
        flag: &str,
        show_help: &mut bool,
    ) -> T {
        match iter.next().and_then(|v| v.parse().ok()) {
            Some(v) => v,
            None => {
                eprintln!("{flag} requires a numeric argument");
                *show_help = true;
                T::default()
            }
        }
    }

    /// Print help text to stderr.
    pub fn print_help() {
        eprintln!(
            "Usage:\n  vidc-player [options] [file.raw]\n\n\
             Plays a raw 8-bit VIDC log-sample stream, or a built-in test tone,\n\
             through the emulated sound DMA pipeline.\n\n\
             Options:\n\
             \x20 --wav <path>      Render to a WAV file instead of the audio device\n\
             \x20 --seconds <n>     Playback duration (default 5)\n\
             \x20 --tone <hz>       Built-in tone frequency (default 440)\n\
             \x20 --freq <n>        VIDC sound frequency register (default 38 = 25kHz)\n\
             \x20 --rate <hz>       Host sample rate (default 44100)\n\
             \x20 --help, -h        Show this help"
        );
    }
}

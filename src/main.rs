use std::io::Cursor;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_card::playback::PLAYBACK_SAMPLE_RATE;
use voice_card::{
    AudioEngine, AudioFormat, AudioResource, Config, Conversation, HttpSynthesizer, LANGUAGES,
    Language, OpenAiTranslator, PlaybackController, PlaybackState, SpeakerEngine,
};

/// Voice Card - speak and translate text the way the app's cards do
#[derive(Parser)]
#[command(name = "voicecard", version, about)]
struct Cli {
    /// Path to config file (defaults to the platform config dir)
    #[arg(short, long, env = "VOICECARD_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak text through a card's playback controller
    Speak {
        /// Text to speak
        text: String,
        /// Voice override
        #[arg(long)]
        voice: Option<String>,
    },
    /// Translate text between the two speakers' languages
    Translate {
        /// Text to translate
        text: String,
        /// Source language (code, subtag or name)
        #[arg(long)]
        from: Option<String>,
        /// Target language (code, subtag or name)
        #[arg(long)]
        to: Option<String>,
        /// Speak the translation
        #[arg(long)]
        speak: bool,
    },
    /// List supported languages
    Languages,
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,voice_card=info",
        1 => "info,voice_card=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Languages => {
            list_languages();
            Ok(())
        }
        Command::TestSpeaker => test_speaker().await,
        Command::Speak { text, voice } => {
            let config = Config::load_from(cli.config.as_deref())?;
            speak(&config, &text, voice).await
        }
        Command::Translate {
            text,
            from,
            to,
            speak: speak_result,
        } => {
            let config = Config::load_from(cli.config.as_deref())?;
            translate(&config, &text, from.as_deref(), to.as_deref(), speak_result).await
        }
    }
}

fn list_languages() {
    for language in LANGUAGES {
        println!("{:<6} {} {}", language.code, language.flag, language.name);
    }
}

/// Play `text` on a single card until the clip ends, fails, or ctrl-c
async fn speak(config: &Config, text: &str, voice: Option<String>) -> anyhow::Result<()> {
    let synthesizer = Arc::new(HttpSynthesizer::from_config(
        &config.voice,
        config.tts_api_key(),
    )?);
    let (engine, status) = SpeakerEngine::new()?;
    let voice = voice.unwrap_or_else(|| config.voice.voice.clone());

    let mut card = PlaybackController::new(synthesizer, engine, status, voice);
    card.set_displayed_text(text);
    card.press()?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut started = false;
    let mut interrupted = false;
    loop {
        let state = tokio::select! {
            state = card.next_event() => state,
            _ = &mut interrupt => {
                interrupted = true;
                break;
            }
        };

        let Some(state) = state else { break };
        tracing::debug!(state = state.label(), "card state");

        match state {
            PlaybackState::Playing => started = true,
            PlaybackState::Idle if started => break,
            PlaybackState::Error(reason) => anyhow::bail!("{reason}"),
            PlaybackState::Idle | PlaybackState::Loading => {}
        }
    }

    if interrupted && card.view_state().is_playing() {
        // Second press on a playing card pauses it
        card.press()?;
    }

    Ok(())
}

async fn translate(
    config: &Config,
    text: &str,
    from: Option<&str>,
    to: Option<&str>,
    speak_result: bool,
) -> anyhow::Result<()> {
    let source = from.map_or(Ok(config.languages.source), Language::parse)?;
    let target = to.map_or(Ok(config.languages.target), Language::parse)?;
    let translator = OpenAiTranslator::new(config.api_keys.openai.clone(), &config.translation)?;

    let mut conversation = Conversation::new(source, target);
    conversation.on_transcript(text);

    let Some(translated) = conversation.translate(&translator).await? else {
        anyhow::bail!("nothing to translate");
    };
    println!("{} {}", target.flag, translated);

    if speak_result {
        let translated = translated.to_string();
        speak(config, &translated, None).await?;
    }

    Ok(())
}

/// Play a 440Hz tone through the speaker engine
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let (mut engine, mut status) = SpeakerEngine::new()?;

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: PLAYBACK_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut wav = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut wav, spec)?;
        for i in 0..num_samples {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            writer.write_sample((2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3)?;
        }
        writer.finalize()?;
    }

    let tone = AudioResource::new(AudioFormat::Wav, wav.into_inner());
    engine.load(&tone)?;
    engine.play()?;

    // Wait for the engine to report the end of the clip
    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(report) = status.recv().await {
            if !report.playing {
                break;
            }
        }
    })
    .await;

    engine.unload();

    if finished.is_err() {
        println!("Playback did not report completion within 5 seconds");
    }

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

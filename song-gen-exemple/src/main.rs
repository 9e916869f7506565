use log::info;
use song_gen_core::io::{load_lyrics, load_music, normalize_folder};
use song_gen_core::model::config::GenerationConfig;
use song_gen_core::model::generator::Generator;
use song_gen_core::music::{KeyChoice, MelodyGenerator, NotePolicy};
use song_gen_core::song::compose_song;

/// Capitalizes the first character of `word`.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut rng = rand::rng();

    // Lyrics: every .txt file in "data/lyrics", one line per sequence
    let lyrics = load_lyrics(normalize_folder("./data/lyrics"))?;
    info!("training lyric models on {} lines", lyrics.len());

    // Lines aim at 6 words; the stop check lets them run a bit shorter or longer
    let mut config = GenerationConfig::new(6)?;
    config.set_stdev(1.0)?;
    let generator = Generator::from_corpus(&lyrics)?.with_config(config)?;

    let song = compose_song(&generator, &mut rng)?;
    let title: Vec<String> = song.title.iter().map(|w| capitalize(w)).collect();
    println!("Song Title: {}\n", title.join(" "));
    for section in song.sections() {
        for line in section {
            println!("{}", capitalize(&line.join(" ")));
        }
        println!();
    }

    // Melodies: every .notes file in "data/music", `pitch:duration` tokens
    let music = load_music(normalize_folder("./data/music"))?;
    info!("training melody models on {} phrases", music.len());
    let melodies = MelodyGenerator::from_corpus(&music)?;

    for (choice, policy) in [
        (KeyChoice::Combined, NotePolicy::Plain),
        (KeyChoice::Pentatonic, NotePolicy::Consonant),
        (KeyChoice::Minor, NotePolicy::Plain),
    ] {
        let melody = melodies.compose(choice, policy, &mut rng)?;
        let notes: Vec<String> = melody.notes.iter().map(ToString::to_string).collect();
        println!("{} ({:?}): {}", melody.key.name(), policy, notes.join(" "));
    }

    Ok(())
}

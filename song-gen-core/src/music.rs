//! Melody generation on top of the back-off models.
//!
//! Notes are `(pitch, duration)` pairs. Generation follows the same loop as
//! lyrics, except candidates are first filtered by a musical key and a
//! [`NotePolicy`]. When the filter leaves nothing, a random in-key note is
//! produced instead of failing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::model::config::GenerationConfig;
use crate::model::generator::Generator;
use crate::model::ngram_model::NGramCounter;
use crate::model::sampler::weighted_choice;
use crate::model::state::Transitions;
use crate::model::token::Token;

/// The twelve pitch classes, sharps only.
pub const CHROMATIC: [&str; 12] = ["c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b"];

const MAJOR_STEPS: [usize; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_STEPS: [usize; 7] = [0, 2, 3, 5, 7, 8, 10];
const PENTATONIC_STEPS: [usize; 5] = [0, 2, 4, 7, 9];

/// Octave given to notes produced by the fallback.
pub const FALLBACK_OCTAVE: u8 = 4;

/// Target length of every melody phrase.
pub const PHRASE_LENGTH: usize = 2;

/// A composed melody body holds at least this many notes.
pub const MIN_SONG_NOTES: usize = 30;

const MAX_PHRASES: usize = 256;

/// A pitch class with its octave, written `c#4`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch {
	class: String,
	octave: u8,
}

impl Pitch {
	pub fn new(class: &str, octave: u8) -> Self {
		Self { class: class.to_lowercase(), octave }
	}

	pub fn class(&self) -> &str {
		&self.class
	}

	pub fn octave(&self) -> u8 {
		self.octave
	}
}

impl fmt::Display for Pitch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.class, self.octave)
	}
}

impl FromStr for Pitch {
	type Err = GenError;

	fn from_str(s: &str) -> Result<Self> {
		let malformed = || GenError::MalformedNote { token: s.to_owned() };
		let split = s.len().checked_sub(1).filter(|i| s.is_char_boundary(*i)).ok_or_else(malformed)?;
		let (class, octave) = s.split_at(split);
		if class.is_empty() || !class.chars().all(|c| c.is_ascii_alphabetic() || c == '#') {
			return Err(malformed());
		}
		let octave = octave.parse::<u8>().map_err(|_| malformed())?;
		Ok(Pitch::new(class, octave))
	}
}

/// One note: a pitch and a duration.
///
/// Durations use the synthesizer convention: 4 is a quarter note, 8 an
/// eighth, and a negative value is dotted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note {
	pub pitch: Pitch,
	pub duration: i8,
}

impl Note {
	pub fn new(pitch: Pitch, duration: i8) -> Self {
		Self { pitch, duration }
	}
}

impl fmt::Display for Note {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.pitch, self.duration)
	}
}

impl FromStr for Note {
	type Err = GenError;

	/// Parses `pitch:duration`, for example `c#4:8`.
	fn from_str(s: &str) -> Result<Self> {
		let malformed = || GenError::MalformedNote { token: s.to_owned() };
		let (pitch, duration) = s.split_once(':').ok_or_else(malformed)?;
		let pitch = pitch.trim().parse::<Pitch>().map_err(|_| malformed())?;
		let duration = duration.trim().parse::<i8>().map_err(|_| malformed())?;
		if duration == 0 {
			return Err(malformed());
		}
		Ok(Note::new(pitch, duration))
	}
}

/// A set of allowed pitch classes, the first one being the tonic.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Key {
	name: String,
	classes: Vec<String>,
}

impl Key {
	/// Creates a key from explicit pitch classes.
	///
	/// # Errors
	/// `EmptyKey` if `classes` is empty.
	pub fn new(name: &str, classes: &[&str]) -> Result<Self> {
		if classes.is_empty() {
			return Err(GenError::EmptyKey);
		}
		Ok(Self {
			name: name.to_owned(),
			classes: classes.iter().map(|c| c.to_lowercase()).collect(),
		})
	}

	fn from_steps(tonic: &str, steps: &[usize], mode: &str) -> Result<Self> {
		let tonic = tonic.to_lowercase();
		let root = CHROMATIC
			.iter()
			.position(|c| *c == tonic)
			.ok_or_else(|| GenError::UnknownPitchClass(tonic.clone()))?;
		let classes: Vec<&str> = steps.iter().map(|step| CHROMATIC[(root + step) % 12]).collect();
		Key::new(&format!("{} {}", tonic, mode), &classes)
	}

	pub fn major(tonic: &str) -> Result<Self> {
		Key::from_steps(tonic, &MAJOR_STEPS, "major")
	}

	/// Natural minor scale.
	pub fn minor(tonic: &str) -> Result<Self> {
		Key::from_steps(tonic, &MINOR_STEPS, "minor")
	}

	/// Major pentatonic scale.
	pub fn pentatonic(tonic: &str) -> Result<Self> {
		Key::from_steps(tonic, &PENTATONIC_STEPS, "pentatonic")
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn classes(&self) -> &[String] {
		&self.classes
	}

	pub fn tonic(&self) -> &str {
		&self.classes[0]
	}

	/// A key reduced to its tonic, used for opening and closing phrases.
	pub fn tonic_only(&self) -> Key {
		Key {
			name: format!("{} tonic", self.name),
			classes: vec![self.tonic().to_owned()],
		}
	}

	pub fn contains(&self, class: &str) -> bool {
		self.classes.iter().any(|c| c == class)
	}
}

/// Which family of keys a melody is drawn from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyChoice {
	Major,
	Minor,
	/// Major or minor, picked at random.
	#[default]
	Combined,
	/// C major pentatonic.
	Pentatonic,
}

fn random_tonic<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
	CHROMATIC[rng.random_range(0..CHROMATIC.len())]
}

impl KeyChoice {
	/// Picks a concrete key of this family.
	///
	/// The pentatonic family has a single key and draws nothing from `rng`.
	pub fn pick<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Key> {
		match self {
			KeyChoice::Major => Key::major(random_tonic(rng)),
			KeyChoice::Minor => Key::minor(random_tonic(rng)),
			KeyChoice::Combined => {
				let tonic = random_tonic(rng);
				if rng.random_bool(0.5) { Key::major(tonic) } else { Key::minor(tonic) }
			}
			KeyChoice::Pentatonic => Key::pentatonic("c"),
		}
	}
}

/// How candidate notes are constrained before sampling.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotePolicy {
	/// Pitch class must belong to the key.
	#[default]
	Plain,
	/// In key, quarter or eighth notes, third octave.
	Consonant,
	/// In key, half notes only.
	Slow,
}

impl NotePolicy {
	/// Whether `note` passes this policy for `key`.
	pub fn accepts(self, note: &Note, key: &Key) -> bool {
		if !key.contains(note.pitch.class()) {
			return false;
		}
		match self {
			NotePolicy::Plain => true,
			NotePolicy::Consonant => matches!(note.duration, 4 | 8) && note.pitch.octave() == 3,
			NotePolicy::Slow => note.duration == 2,
		}
	}

	/// Durations drawn from when the fallback produces a note.
	pub fn duration_pool(self) -> &'static [i8] {
		match self {
			NotePolicy::Plain => &[1, 2, 4, 8, 16, -4, -8],
			NotePolicy::Consonant => &[4, 8],
			NotePolicy::Slow => &[1, 2],
		}
	}
}

/// Keeps the candidates allowed by `policy` in `key`.
///
/// The end marker is always kept, so a phrase can still finish naturally.
pub fn constrain_candidates(candidates: &Transitions<Note>, key: &Key, policy: NotePolicy) -> Transitions<Note> {
	candidates
		.iter()
		.filter(|(token, _)| match token {
			Token::Value(note) => policy.accepts(note, key),
			Token::End => true,
			_ => false,
		})
		.map(|(token, count)| (token.clone(), *count))
		.collect::<BTreeMap<_, _>>()
}

/// A random in-key note at the fallback octave.
fn fallback_note<R: Rng + ?Sized>(key: &Key, policy: NotePolicy, rng: &mut R) -> Result<Note> {
	let class = key.classes().choose(rng).ok_or(GenError::EmptyKey)?;
	let duration = policy.duration_pool().choose(rng).copied().ok_or(GenError::EmptyCandidates)?;
	Ok(Note::new(Pitch::new(class, FALLBACK_OCTAVE), duration))
}

/// Picks the next note of `sequence` with `model`, constrained by `key`.
///
/// # Behavior
/// - Candidates come from the model's trailing context.
/// - Notes rejected by `policy` are dropped, the end marker is kept.
/// - If nothing is left, a random pitch class of `key` is returned with a
///   duration from the policy's pool.
pub fn next_note<M, R>(model: &M, sequence: &[Token<Note>], key: &Key, policy: NotePolicy, rng: &mut R) -> Result<Token<Note>>
where
	M: NGramCounter<Note>,
	R: Rng + ?Sized,
{
	let allowed = constrain_candidates(model.candidates(sequence)?, key, policy);
	if allowed.is_empty() {
		let note = fallback_note(key, policy, rng)?;
		debug!("no {:?} candidate in {}, falling back to {}", policy, key.name(), note);
		return Ok(Token::Value(note));
	}
	weighted_choice(&allowed, rng)
}

/// A finished melody and the key it was written in.
#[derive(Serialize, Clone, Debug)]
pub struct Melody {
	pub key: Key,
	pub notes: Vec<Note>,
}

/// Generates phrases and whole melodies from a note corpus.
#[derive(Clone, Debug)]
pub struct MelodyGenerator {
	generator: Generator<Note>,
}

impl MelodyGenerator {
	pub fn new(generator: Generator<Note>) -> Self {
		Self { generator }
	}

	/// Trains the back-off models on a note corpus.
	pub fn from_corpus(corpus: &[Vec<Note>]) -> Result<Self> {
		Ok(Self::new(Generator::from_corpus(corpus)?))
	}

	pub fn generator(&self) -> &Generator<Note> {
		&self.generator
	}

	/// Generates one phrase, every note drawn under `policy` in `key`.
	pub fn generate_phrase<R: Rng + ?Sized>(
		&self,
		target_length: usize,
		key: &Key,
		policy: NotePolicy,
		rng: &mut R,
	) -> Result<Vec<Note>> {
		let mut config: GenerationConfig = self.generator.config().clone();
		config.set_target_length(target_length)?;
		self.generator.generate_by(&config, rng, |model, sequence, rng| {
			next_note(model.select(sequence), sequence, key, policy, rng)
		})
	}

	/// Composes a melody.
	///
	/// # Behavior
	/// - Picks a key from `choice`.
	/// - Opens with a tonic phrase (slow, or consonant for the consonant
	///   policy).
	/// - Appends phrases of `PHRASE_LENGTH` notes until the body holds at
	///   least `MIN_SONG_NOTES` notes.
	/// - Closes with the opening tonic phrase again.
	pub fn compose<R: Rng + ?Sized>(&self, choice: KeyChoice, policy: NotePolicy, rng: &mut R) -> Result<Melody> {
		let key = choice.pick(rng)?;
		let tonic_policy = match policy {
			NotePolicy::Consonant => NotePolicy::Consonant,
			_ => NotePolicy::Slow,
		};
		let tonic = self.generate_phrase(PHRASE_LENGTH, &key.tonic_only(), tonic_policy, rng)?;

		let mut body = Vec::new();
		for _ in 0..MAX_PHRASES {
			if body.len() >= MIN_SONG_NOTES {
				break;
			}
			body.extend(self.generate_phrase(PHRASE_LENGTH, &key, policy, rng)?);
		}
		if body.len() < MIN_SONG_NOTES {
			warn!("melody body only reached {} notes", body.len());
		}

		let mut notes = Vec::with_capacity(body.len() + 2 * tonic.len());
		notes.extend(tonic.iter().cloned());
		notes.extend(body);
		notes.extend(tonic);
		debug!("composed {} notes in {}", notes.len(), key.name());
		Ok(Melody { key, notes })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ngram_model::NGramModel;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn note(s: &str) -> Note {
		s.parse().unwrap()
	}

	fn line(s: &str) -> Vec<Note> {
		s.split_whitespace().map(note).collect()
	}

	fn corpus() -> Vec<Vec<Note>> {
		vec![
			line("c4:4 d4:4 e4:8 f4:8 g4:2 a4:4 b4:4 c5:2"),
			line("e3:4 g3:8 c4:4 d#4:8 g3:2"),
			line("c3:4 e3:8 g3:4 a3:8 c3:2 d3:4"),
			line("f#4:4 g#4:4 a#4:2 c#4:4"),
		]
	}

	#[test]
	fn parses_and_prints_notes() {
		let n = note("c#4:-8");
		assert_eq!(n.pitch.class(), "c#");
		assert_eq!(n.pitch.octave(), 4);
		assert_eq!(n.duration, -8);
		assert_eq!(n.to_string(), "c#4:-8");
		assert_eq!(note("A3:4").pitch.class(), "a");
	}

	#[test]
	fn rejects_malformed_notes() {
		for token in ["c4", "c:4", "4:4", "c4:x", "c4:0", "", ":"] {
			assert!(matches!(token.parse::<Note>(), Err(GenError::MalformedNote { .. })), "{token}");
		}
	}

	#[test]
	fn builds_scales() {
		let key = Key::major("c").unwrap();
		assert_eq!(key.classes(), ["c", "d", "e", "f", "g", "a", "b"]);
		let key = Key::minor("a").unwrap();
		assert_eq!(key.classes(), ["a", "b", "c", "d", "e", "f", "g"]);
		let key = Key::pentatonic("c").unwrap();
		assert_eq!(key.classes(), ["c", "d", "e", "g", "a"]);
		assert_eq!(Key::major("g").unwrap().tonic(), "g");
		assert!(matches!(Key::major("h"), Err(GenError::UnknownPitchClass(_))));
		assert!(matches!(Key::new("none", &[]), Err(GenError::EmptyKey)));
	}

	#[test]
	fn key_choice_respects_family() {
		let mut rng = StdRng::seed_from_u64(8);
		for _ in 0..20 {
			assert!(KeyChoice::Major.pick(&mut rng).unwrap().name().ends_with("major"));
			assert!(KeyChoice::Minor.pick(&mut rng).unwrap().name().ends_with("minor"));
		}
		assert_eq!(KeyChoice::Pentatonic.pick(&mut rng).unwrap().name(), "c pentatonic");
	}

	#[test]
	fn policies_filter_candidates() {
		let key = Key::major("c").unwrap();
		let candidates: Transitions<Note> = BTreeMap::from([
			(Token::Value(note("c3:4")), 1),
			(Token::Value(note("c4:2")), 2),
			(Token::Value(note("c#4:4")), 3),
			(Token::Value(note("e3:16")), 1),
			(Token::End, 1),
		]);

		let plain = constrain_candidates(&candidates, &key, NotePolicy::Plain);
		assert_eq!(plain.len(), 4);
		assert!(!plain.contains_key(&Token::Value(note("c#4:4"))));

		let consonant = constrain_candidates(&candidates, &key, NotePolicy::Consonant);
		assert_eq!(
			consonant,
			BTreeMap::from([(Token::Value(note("c3:4")), 1), (Token::End, 1)])
		);

		let slow = constrain_candidates(&candidates, &key, NotePolicy::Slow);
		assert_eq!(slow, BTreeMap::from([(Token::Value(note("c4:2")), 2), (Token::End, 1)]));
	}

	#[test]
	fn empty_filter_falls_back_to_key() {
		let mut model = NGramModel::unigram();
		model.train(&[line("c#4:4 d#4:4")]).unwrap();
		let key = Key::major("c").unwrap();
		let mut rng = StdRng::seed_from_u64(12);

		for policy in [NotePolicy::Plain, NotePolicy::Consonant, NotePolicy::Slow] {
			for _ in 0..50 {
				let token = next_note(&model, &[], &key, policy, &mut rng).unwrap();
				let note = token.into_value().unwrap();
				assert!(key.contains(note.pitch.class()));
				assert_eq!(note.pitch.octave(), FALLBACK_OCTAVE);
				assert!(policy.duration_pool().contains(&note.duration));
			}
		}
	}

	#[test]
	fn phrases_stay_in_key() {
		let melodies = MelodyGenerator::from_corpus(&corpus()).unwrap();
		let key = Key::major("c").unwrap();
		for seed in 0..50 {
			let mut rng = StdRng::seed_from_u64(seed);
			let phrase = melodies.generate_phrase(4, &key, NotePolicy::Plain, &mut rng).unwrap();
			assert!(phrase.iter().all(|n| key.contains(n.pitch.class())));
		}
	}

	#[test]
	fn composed_melody_is_framed_by_tonic_phrases() {
		let melodies = MelodyGenerator::from_corpus(&corpus()).unwrap();
		for seed in 0..20 {
			let mut rng = StdRng::seed_from_u64(seed);
			for choice in [KeyChoice::Major, KeyChoice::Minor] {
				let melody = melodies.compose(choice, NotePolicy::Plain, &mut rng).unwrap();

				assert!(melody.notes.len() >= MIN_SONG_NOTES);
				let tonic = melody.key.tonic();
				assert!(melody.notes.iter().all(|n| melody.key.contains(n.pitch.class())));
				assert_eq!(melody.notes.first().map(|n| n.pitch.class()), Some(tonic), "seed {seed}");
				assert_eq!(melody.notes.last().map(|n| n.pitch.class()), Some(tonic), "seed {seed}");
			}
		}
	}

	#[test]
	fn pentatonic_pick_leaves_rng_alone() {
		let mut used = StdRng::seed_from_u64(5);
		let mut fresh = StdRng::seed_from_u64(5);
		let key = KeyChoice::Pentatonic.pick(&mut used).unwrap();
		assert_eq!(key.tonic(), "c");
		assert_eq!(used.random::<u64>(), fresh.random::<u64>());
	}
}

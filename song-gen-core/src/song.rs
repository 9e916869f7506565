use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::error::Result;
use crate::model::generator::Generator;

/// Lines in each verse and in the chorus.
pub const LINES_PER_SECTION: usize = 4;

/// Target word count of every lyric line.
pub const LINE_LENGTH: usize = 6;

/// A generated song: two verses, a chorus and a title taken from the chorus.
///
/// Lines are raw token lists; capitalization and layout belong to the
/// renderer.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Song {
	pub title: Vec<String>,
	pub verse_one: Vec<Vec<String>>,
	pub verse_two: Vec<Vec<String>>,
	pub chorus: Vec<Vec<String>>,
}

impl Song {
	/// Sections in performance order: verse, chorus, verse, chorus.
	pub fn sections(&self) -> [&[Vec<String>]; 4] {
		[&self.verse_one, &self.chorus, &self.verse_two, &self.chorus]
	}
}

fn section<R: Rng + ?Sized>(generator: &Generator<String>, rng: &mut R) -> Result<Vec<Vec<String>>> {
	(0..LINES_PER_SECTION)
		.map(|_| generator.generate_with(LINE_LENGTH, &mut *rng))
		.collect()
}

/// Composes a song from a trained lyric generator.
///
/// The title is the last two or three words of the chorus's final line,
/// picked at random (shorter if the line itself is shorter).
pub fn compose_song<R: Rng + ?Sized>(generator: &Generator<String>, rng: &mut R) -> Result<Song> {
	let verse_one = section(generator, rng)?;
	let verse_two = section(generator, rng)?;
	let chorus = section(generator, rng)?;

	let last_line = chorus.last().map(Vec::as_slice).unwrap_or_default();
	let title_len = rng.random_range(2..=3).min(last_line.len());
	let title = last_line[last_line.len() - title_len..].to_vec();
	debug!("composed song '{}'", title.join(" "));

	Ok(Song { title, verse_one, verse_two, chorus })
}

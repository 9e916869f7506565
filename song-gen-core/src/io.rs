use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs};

use log::debug;

use crate::error::{GenError, Result};
use crate::music::Note;

/// Extension of lyric corpus files.
pub const LYRICS_EXTENSION: &str = "txt";

/// Extension of note corpus files.
pub const MUSIC_EXTENSION: &str = "notes";

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted so loading order is stable.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<String>> {
	let dir = dir.as_ref();
	if !dir.is_dir() {
		return Err(GenError::NotADirectory(dir.to_path_buf()));
	}

	let mut files = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}
	files.sort();

	Ok(files)
}

/// Splits a lyric line into lower-case words.
///
/// Surrounding punctuation is dropped, inner apostrophes are kept
/// (`"Don't,"` → `"don't"`).
pub fn tokenize_line(line: &str) -> Vec<String> {
	line.split_whitespace()
		.map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_lowercase())
		.filter(|word| !word.is_empty())
		.collect()
}

/// Parses one line of `pitch:duration` tokens.
///
/// # Errors
/// `MalformedNote` on the first token that does not parse.
pub fn parse_melody_line(line: &str) -> Result<Vec<Note>> {
	line.split_whitespace().map(str::parse).collect()
}

fn load_dir<T, F>(dir: &Path, extension: &str, mut parse: F) -> Result<Vec<Vec<T>>>
where
	F: FnMut(&str) -> Result<Vec<T>>,
{
	let mut corpus = Vec::new();
	for file in list_files(dir, extension)? {
		for line in read_file(dir.join(&file))? {
			let sequence = parse(&line)?;
			if !sequence.is_empty() {
				corpus.push(sequence);
			}
		}
	}
	debug!("loaded {} sequences from {}", corpus.len(), dir.display());
	Ok(corpus)
}

/// Loads every `*.txt` file of `dir` as a lyric corpus, one sequence per
/// non-empty line.
pub fn load_lyrics<P: AsRef<Path>>(dir: P) -> Result<Vec<Vec<String>>> {
	load_dir(dir.as_ref(), LYRICS_EXTENSION, |line| Ok(tokenize_line(line)))
}

/// Loads every `*.notes` file of `dir` as a note corpus, one sequence per
/// non-empty line.
pub fn load_music<P: AsRef<Path>>(dir: P) -> Result<Vec<Vec<Note>>> {
	load_dir(dir.as_ref(), MUSIC_EXTENSION, parse_melody_line)
}

use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::Deserialize;

use song_gen_core::GenError;
use song_gen_core::io::{load_lyrics, load_music};
use song_gen_core::model::backoff::BackoffModel;
use song_gen_core::model::config::GenerationConfig;
use song_gen_core::model::generator::Generator;
use song_gen_core::model::ngram_model::NGramCounter;
use song_gen_core::model::token::Symbol;
use song_gen_core::music::{KeyChoice, MelodyGenerator, NotePolicy};
use song_gen_core::song::compose_song;

const LYRICS_DIR: &str = "./data/lyrics";
const MUSIC_DIR: &str = "./data/music";
const MAX_LINES: usize = 64;
const MAX_STEPS: usize = 512;

/// Line count for the `/v1/lyrics` endpoint.
///
/// The generation parameters (`target_length`, `stdev`, `max_steps`) are
/// read from the same query string as a `GenerationConfig`.
#[derive(Deserialize)]
struct LinesParam {
	lines: Option<usize>,
}

/// Struct representing query parameters for the `/v1/melody` endpoint
#[derive(Deserialize)]
struct MelodyParams {
	key: Option<KeyChoice>,
	policy: Option<NotePolicy>,
}

/// Trained models, read-only once the server is up.
struct SharedData {
	lyrics: Generator<String>,
	melodies: MelodyGenerator,
}

/// Maps a core error onto an HTTP response.
fn error_response(e: GenError) -> HttpResponse {
	match e {
		GenError::InvalidConfig(_) => HttpResponse::BadRequest().body(e.to_string()),
		_ => {
			error!("generation failed: {}", e);
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// Checks a query-built configuration and caps its loop bound.
fn lyrics_config(mut config: GenerationConfig) -> Result<GenerationConfig, GenError> {
	config.validate()?;
	config.set_max_steps(config.max_steps().min(MAX_STEPS))?;
	Ok(config)
}

/// HTTP GET endpoint `/v1/lyrics`
///
/// Generates `lines` lyric lines (default 1) as plain text, one per line.
#[get("/v1/lyrics")]
async fn get_lyrics(
	data: web::Data<SharedData>,
	config: web::Query<GenerationConfig>,
	lines: web::Query<LinesParam>,
) -> impl Responder {
	let config = match lyrics_config(config.into_inner()) {
		Ok(c) => c,
		Err(e) => return error_response(e),
	};
	let lines = lines.lines.unwrap_or(1).clamp(1, MAX_LINES);

	let mut rng = rand::rng();
	let mut output = Vec::with_capacity(lines);
	for _ in 0..lines {
		match data.lyrics.generate_with_config(&config, &mut rng) {
			Ok(line) => output.push(line.join(" ")),
			Err(e) => return error_response(e),
		}
	}

	HttpResponse::Ok().body(output.join("\n"))
}

/// HTTP GET endpoint `/v1/song`
///
/// Returns a whole song (title, verses, chorus) as JSON.
#[get("/v1/song")]
async fn get_song(data: web::Data<SharedData>) -> impl Responder {
	match compose_song(&data.lyrics, &mut rand::rng()) {
		Ok(song) => HttpResponse::Ok().json(song),
		Err(e) => error_response(e),
	}
}

/// HTTP GET endpoint `/v1/melody`
///
/// Returns a composed melody and its key as JSON.
#[get("/v1/melody")]
async fn get_melody(data: web::Data<SharedData>, query: web::Query<MelodyParams>) -> impl Responder {
	let choice = query.key.unwrap_or_default();
	let policy = query.policy.unwrap_or_default();
	match data.melodies.compose(choice, policy, &mut rand::rng()) {
		Ok(melody) => HttpResponse::Ok().json(melody),
		Err(e) => error_response(e),
	}
}

/// One line per n-gram model: order, contexts and distinct predicted tokens.
fn describe_models<T: Symbol>(name: &str, model: &BackoffModel<T>) -> String {
	let models: Vec<String> = model
		.models()
		.iter()
		.map(|m| format!("{} {} contexts {} tokens", m.order(), m.context_count(), m.vocabulary_size()))
		.collect();
	let state = if model.is_trained() { "trained" } else { "untrained" };
	format!("{} ({}): {}", name, state, models.join(", "))
}

/// HTTP GET endpoint `/v1/models`
///
/// Summarizes the trained lyric and melody models as plain text.
#[get("/v1/models")]
async fn get_models(data: web::Data<SharedData>) -> impl Responder {
	let lyrics = describe_models("lyrics", data.lyrics.model());
	let music = describe_models("music", data.melodies.generator().model());
	HttpResponse::Ok().body(format!("{}\n{}", lyrics, music))
}

/// Main entry point for the server.
///
/// Trains the lyric and melody models once, shares them read-only with
/// every worker, and starts an Actix-web HTTP server.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Corpora are read from `./data/lyrics` and `./data/music`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let train = || -> Result<SharedData, GenError> {
		let lyrics = Generator::from_corpus(&load_lyrics(LYRICS_DIR)?)?;
		let melodies = MelodyGenerator::from_corpus(&load_music(MUSIC_DIR)?)?;
		Ok(SharedData { lyrics, melodies })
	};
	let shared_data = train().map_err(std::io::Error::other)?;
	info!("models trained, listening on 127.0.0.1:5000");
	let shared_data = web::Data::new(shared_data);

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_lyrics)
			.service(get_song)
			.service(get_melody)
			.service(get_models)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}

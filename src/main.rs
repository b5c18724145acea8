//! Evo Browse CLI - breed images from the terminal.
//!
//! Events are read from stdin, one per line: a single character is a key
//! press, `X Y` or `click X Y` is a click at that pixel of the grid image,
//! and `raw TAG PAYLOAD` is a host event in raw form. The grid is mirrored
//! to a PPM file when `live_image` is configured.

use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use evo_browse::{
    browser::{Browser, Event, EventSender, Session, SessionExit, channel},
    display::{Display, Framebuffer, Thumbnail},
    genome::{Genome, RasterGenome, TurtleGenome},
    schema::BrowserConfig,
};

/// Minimum time between live image writes.
const LIVE_INTERVAL: Duration = Duration::from_millis(250);

/// Framebuffer that mirrors itself to a PPM file on `show`.
struct LiveView {
    framebuffer: Framebuffer,
    path: Option<PathBuf>,
    last_write: Option<Instant>,
}

impl LiveView {
    fn new(config: &BrowserConfig) -> Self {
        Self {
            framebuffer: Framebuffer::new(
                config.cols,
                config.rows,
                config.thumb_width,
                config.thumb_height,
            ),
            path: config.live_image.clone(),
            last_write: None,
        }
    }

    fn write(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.framebuffer.write_ppm(&mut writer, &[])?;
        writer.flush()
    }
}

impl Display for LiveView {
    fn paint(&mut self, index: usize, thumbnail: &Thumbnail) -> evo_browse::Result<()> {
        self.framebuffer.paint(index, thumbnail)
    }

    fn show(&mut self) {
        self.framebuffer.show();
        let Some(path) = &self.path else {
            return;
        };
        if self
            .last_write
            .is_some_and(|at| at.elapsed() < LIVE_INTERVAL)
        {
            return;
        }
        match self.write(path) {
            Ok(()) => self.last_write = Some(Instant::now()),
            Err(e) => warn!("Could not write {}: {}", path.display(), e),
        }
    }

    fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }
}

/// Parse one line of input into an event.
fn parse_event(line: &str) -> Option<Event> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let number = |word: &str| word.parse::<u32>().ok();
    match words.as_slice() {
        [word] if word.chars().count() == 1 => word.chars().next().map(Event::Keyboard),
        ["click", x, y] | [x, y] => Some(Event::Mouse {
            x: number(*x)?,
            y: number(*y)?,
        }),
        ["raw", tag, payload] => Some(Event::from_raw(number(*tag)?, number(*payload)?)),
        _ => None,
    }
}

/// Forward stdin lines as events until stdin or the session ends.
fn spawn_reader(events: EventSender) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_event(&line) {
                Some(event) => {
                    debug!("Input {:?}", event);
                    if !events.send(event) {
                        break;
                    }
                }
                None => eprintln!("Could not parse {:?}", line),
            }
        }
    });
}

fn print_summary<G: Genome, D: Display>(browser: &Browser<G, D>) {
    let population = browser.population();
    println!("{} population, {}x{}:", G::KIND, population.cols(), population.rows());
    let cells: Vec<String> = population
        .slots()
        .map(|slot| match slot.complexity() {
            Some(c) => format!("{:>5}", c),
            None => "    -".to_string(),
        })
        .collect();
    for row in cells.chunks(population.cols()) {
        println!("{}", row.join(""));
    }
}

fn browse<G: Genome>(config: BrowserConfig) -> evo_browse::Result<()> {
    let display = LiveView::new(&config);
    let browser: Browser<G, _> = Browser::new(config, display)?;
    let (events, input) = channel();
    spawn_reader(events);

    let mut session = Session::new(browser, input);
    loop {
        match session.run()? {
            SessionExit::Quit | SessionExit::InputClosed => break,
            SessionExit::CommandLoop => print_summary(session.browser()),
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <raster|turtle> [config.json]", args[0]);
        eprintln!();
        eprintln!("Breed evolved images by picking them from a grid.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  raster|turtle  Genome kind to browse");
        eprintln!("  config.json    Browser configuration (default: built-in)");
        eprintln!();
        eprintln!("Input, one event per line on stdin:");
        eprintln!("  f g b i s r v a 1 q !   commands");
        eprintln!("  X Y | click X Y        click at pixel (X, Y)");
        eprintln!("  raw TAG PAYLOAD        host event (1 = key, 2 = mouse)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config = match args.get(2) {
        Some(path) => {
            let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => BrowserConfig::default(),
    };

    let result = match args[1].as_str() {
        "raster" => browse::<RasterGenome>(config),
        "turtle" => browse::<TurtleGenome>(config),
        other => {
            eprintln!("Unknown genome kind: {}", other);
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_example_config() {
    let config = BrowserConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}

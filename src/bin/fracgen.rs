extern crate clap;
extern crate env_logger;
extern crate fractalgen;
#[macro_use]
extern crate log;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use fractalgen::{render_threaded, FractalKind, ImageFormat, RenderRequest};
use std::fs::File;
use std::io::Write;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const SEED: &str = "seed";
const FRACTAL: &str = "fractal";
const FORMAT: &str = "format";
const ITERATIONS: &str = "iterations";
const THREADS: &str = "threads";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("fracgen")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Seeded fractal renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("720x432")
                .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image (clamped to the format's maximum)"),
        )
        .arg(
            Arg::with_name(SEED)
                .required(false)
                .long(SEED)
                .takes_value(true)
                .validator(|s| validate_number::<u32>(&s, "Could not parse seed"))
                .help("Seed determining every parameter of the image (default: random)"),
        )
        .arg(
            Arg::with_name(FRACTAL)
                .required(false)
                .long(FRACTAL)
                .short("f")
                .takes_value(true)
                .possible_values(&["mandelbrot", "julia", "burningship"])
                .help("Fractal family (default: chosen by the seed)"),
        )
        .arg(
            Arg::with_name(FORMAT)
                .required(false)
                .long(FORMAT)
                .takes_value(true)
                .default_value("bmp")
                .possible_values(&["bmp", "png"])
                .help("Output format"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("50")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        800,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 800",
                    )
                })
                .help("Iteration budget per pixel"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in the renderer"),
        )
        .get_matches()
}

fn main() {
    env_logger::init();
    let matches = args();

    let (width, height) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing image dimensions");
    let seed = matches
        .value_of(SEED)
        .map(|s| u32::from_str(s).expect("Could not parse seed"));
    let kind = matches
        .value_of(FRACTAL)
        .map(|s| FractalKind::from_str(s).expect("Could not parse fractal family"));
    let format = ImageFormat::from_str(matches.value_of(FORMAT).unwrap())
        .expect("Could not parse output format");
    let iterations = u32::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Could not parse iteration count");
    let threads =
        usize::from_str(matches.value_of(THREADS).unwrap()).expect("Could not parse thread count");

    let request = RenderRequest {
        seed,
        kind,
        width: Some(width),
        height: Some(height),
        iterations: Some(iterations),
        format,
    };

    match render_threaded(&request, threads) {
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        Ok(img) => {
            let outfile = matches.value_of(OUTPUT).unwrap();
            info!(
                "rendered {} {}x{} seed={} ({} bytes)",
                img.kind.name(),
                img.width,
                img.height,
                img.seed,
                img.bytes.len()
            );
            let mut output = File::create(outfile).expect("Could not create output file");
            output
                .write_all(&img.bytes)
                .expect("Could not write output file");
        }
    }
}

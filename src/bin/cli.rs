use clap::{App, Arg, ArgMatches, SubCommand};
use log::info;
use memframe::{
    discovery::{self, ScanOptions},
    error::MemFrameError,
    memory::{BackingType, RegionConfig, SharedRegion},
    poll_loop::{PollConfig, PollLoop, ProducerLoop, TestPattern},
    protocol::{Consumer, Frame, Producer},
    region_layout::{RegionLayout, OWNERSHIP_OFFSET, PAYLOAD_OFFSET},
    remote::{AccessMethod, ProcMemory, RemoteRegion},
    Result,
};
use std::{str::FromStr, sync::Arc};

fn main() -> Result<()> {
    env_logger::init();

    let width_arg = || {
        Arg::with_name("width")
            .long("width")
            .value_name("PIXELS")
            .help("Frame width agreed with the peer")
            .default_value("640")
            .takes_value(true)
    };
    let height_arg = || {
        Arg::with_name("height")
            .long("height")
            .value_name("PIXELS")
            .help("Frame height agreed with the peer")
            .default_value("480")
            .takes_value(true)
    };
    let fps_arg = || {
        Arg::with_name("fps")
            .long("fps")
            .value_name("HZ")
            .help("Ticks per second")
            .default_value("60")
            .takes_value(true)
    };
    let pid_arg = || {
        Arg::with_name("pid")
            .short("p")
            .long("pid")
            .value_name("PID")
            .help("Process holding the region")
            .required(true)
            .takes_value(true)
    };
    let method_arg = || {
        Arg::with_name("method")
            .long("method")
            .value_name("METHOD")
            .help("Memory access method")
            .possible_values(&["procmem", "vm"])
            .default_value("procmem")
            .takes_value(true)
    };
    let all_ranges_arg = || {
        Arg::with_name("all_ranges")
            .long("all-ranges")
            .help("Scan read-only ranges as well")
    };

    let matches = App::new("memframe-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Frame handoff through foreign process memory")
        .subcommand(
            SubCommand::with_name("layout")
                .about("Print region offsets and sizes for a frame size")
                .arg(width_arg())
                .arg(height_arg()),
        )
        .subcommand(
            SubCommand::with_name("host")
                .about("Allocate a region and consume frames written into it")
                .arg(width_arg())
                .arg(height_arg())
                .arg(fps_arg())
                .arg(
                    Arg::with_name("ticks")
                        .short("t")
                        .long("ticks")
                        .value_name("COUNT")
                        .help("Stop after this many ticks (default: run forever)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("backing")
                        .short("b")
                        .long("backing")
                        .value_name("TYPE")
                        .help("Region backing: anonymous, file or memfd")
                        .default_value("anonymous")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("scan")
                .about("Search a process for regions")
                .arg(pid_arg())
                .arg(width_arg())
                .arg(height_arg())
                .arg(method_arg())
                .arg(all_ranges_arg()),
        )
        .subcommand(
            SubCommand::with_name("produce")
                .about("Write a test pattern into a process's region")
                .arg(pid_arg())
                .arg(width_arg())
                .arg(height_arg())
                .arg(fps_arg())
                .arg(method_arg())
                .arg(all_ranges_arg())
                .arg(
                    Arg::with_name("frames")
                        .short("n")
                        .long("frames")
                        .value_name("COUNT")
                        .help("Number of ticks to run")
                        .default_value("600")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("address")
                        .short("a")
                        .long("address")
                        .value_name("HEX")
                        .help("Region base address; skips discovery")
                        .takes_value(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("layout", Some(layout_matches)) => show_layout(layout_matches),
        ("host", Some(host_matches)) => handle_host(host_matches),
        ("scan", Some(scan_matches)) => handle_scan(scan_matches),
        ("produce", Some(produce_matches)) => handle_produce(produce_matches),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    let value = matches
        .value_of(name)
        .ok_or_else(|| MemFrameError::invalid_parameter(name, "Missing value"))?;
    value
        .parse()
        .map_err(|_| MemFrameError::invalid_parameter(name, format!("Invalid value '{}'", value)))
}

fn parse_layout(matches: &ArgMatches) -> Result<RegionLayout> {
    RegionLayout::new(parse_arg(matches, "width")?, parse_arg(matches, "height")?)
}

fn parse_method(matches: &ArgMatches) -> AccessMethod {
    match matches.value_of("method") {
        Some("vm") => AccessMethod::VmReadv,
        _ => AccessMethod::ProcMem,
    }
}

fn scan_options(matches: &ArgMatches) -> ScanOptions {
    ScanOptions::new().with_writeable_only(!matches.is_present("all_ranges"))
}

fn show_layout(matches: &ArgMatches) -> Result<()> {
    let layout = parse_layout(matches)?;
    println!("Region layout for {}x{}:", layout.width(), layout.height());
    println!("  MagicStart:    offset 0, bytes {:02x?}", RegionLayout::magic_start_bytes());
    println!("  Ownership:     offset {}", OWNERSHIP_OFFSET);
    println!("  Payload:       offset {}, {} bytes", PAYLOAD_OFFSET, layout.payload_size());
    println!(
        "  MagicEnd:      offset {}, bytes {:02x?}",
        layout.magic_end_offset(),
        RegionLayout::magic_end_bytes()
    );
    println!("  Total size:    {} bytes", layout.total_size());
    Ok(())
}

fn handle_host(matches: &ArgMatches) -> Result<()> {
    let layout = parse_layout(matches)?;
    let backing = matches.value_of("backing").unwrap_or("anonymous");
    let backing_type = BackingType::from_name(backing)
        .ok_or_else(|| MemFrameError::invalid_parameter("backing", format!("Unknown backing '{}'", backing)))?;

    let config = RegionConfig::new("host", layout.width(), layout.height())
        .with_backing_type(backing_type);
    let region = Arc::new(SharedRegion::create(config)?);
    println!("Hosting region: {}", region.handle());

    let mut poll_config = PollConfig::from_hz(parse_arg(matches, "fps")?)?;
    if matches.is_present("ticks") {
        poll_config = poll_config.with_max_ticks(parse_arg(matches, "ticks")?);
    }

    let mut consumer = Consumer::new(Arc::clone(&region));
    let mut sink = |frame: &Frame| -> Result<()> {
        let checksum = frame
            .as_bytes()
            .iter()
            .fold(0u32, |acc, &b| acc.wrapping_mul(31).wrapping_add(b as u32));
        info!("Frame {}x{} checksum {:08x}", frame.width(), frame.height(), checksum);
        Ok(())
    };

    let summary = PollLoop::new(poll_config)?.run(&mut consumer, &mut sink)?;
    println!("\nResults:");
    println!("  Ticks: {}", summary.ticks);
    println!("  Frames: {}", summary.frames);
    println!("  Missed deadlines: {}", summary.missed_ticks);
    println!("  {}", consumer.stats().summary());
    Ok(())
}

fn handle_scan(matches: &ArgMatches) -> Result<()> {
    let pid: i32 = parse_arg(matches, "pid")?;
    let layout = parse_layout(matches)?;
    let memory = ProcMemory::open(pid, parse_method(matches))?;

    let report = discovery::scan(&memory, &layout, &scan_options(matches))?;
    println!("Scanned {} ranges ({} skipped, {} bytes)", report.ranges_scanned, report.ranges_skipped, report.bytes_read);
    println!("Start markers: {}", report.start_hits);
    if report.candidates.is_empty() {
        println!("No region found");
    } else {
        println!("Candidate regions:");
        for base in &report.candidates {
            println!("  - {:#x}", base);
        }
    }
    Ok(())
}

fn handle_produce(matches: &ArgMatches) -> Result<()> {
    let pid: i32 = parse_arg(matches, "pid")?;
    let layout = parse_layout(matches)?;
    let memory = ProcMemory::open(pid, parse_method(matches))?;

    let region = match matches.value_of("address") {
        Some(address) => {
            let base = u64::from_str_radix(address.trim_start_matches("0x"), 16).map_err(|_| {
                MemFrameError::invalid_parameter("address", format!("Invalid address '{}'", address))
            })?;
            RemoteRegion::at_address(memory, base, layout)?
        }
        None => RemoteRegion::discover(memory, layout, &scan_options(matches))?,
    };
    println!("Writing to region: {}", region.handle());

    let poll_config = PollConfig::from_hz(parse_arg(matches, "fps")?)?
        .with_max_ticks(parse_arg(matches, "frames")?);
    let mut producer = Producer::new(region);
    let mut pattern = TestPattern::new(layout);

    let summary = ProducerLoop::new(poll_config)?.run(&mut producer, &mut pattern)?;
    println!("\nResults:");
    println!("  Ticks: {}", summary.ticks);
    println!("  Written: {}", summary.written);
    println!("  Skipped: {}", summary.skipped);
    println!("  Elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    Ok(())
}

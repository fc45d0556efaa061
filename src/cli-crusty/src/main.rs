extern crate clap;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use env_logger::Env;
use log::{debug, error, info};

use common::{AggOp, CrustyError, SimplePredicateOp, TableSchema};
use queryexe::opiterator::{Aggregate, Join};
use queryexe::{Executor, OpIterator};

use std::process;

mod config;
mod csv_utils;

use config::CliConfig;

fn build_app() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .possible_values(&["csv", "width"])
                .help("Output format, overrides the config file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-header")
                .long("no-header")
                .help("Do not print the output schema"),
        )
        .subcommand(
            SubCommand::with_name("join")
                .about("Nested-loop join of two CSV files")
                .arg(table_arg("left", "Left (outer) CSV file"))
                .arg(schema_arg("left-schema"))
                .arg(table_arg("right", "Right (inner) CSV file"))
                .arg(schema_arg("right-schema"))
                .arg(field_arg("left-field", "Join field of the left file, by index or name").required(true))
                .arg(field_arg("right-field", "Join field of the right file, by index or name").required(true))
                .arg(
                    Arg::with_name("op")
                        .long("op")
                        .value_name("OP")
                        .possible_values(&["eq", "gt", "lt", "le", "ge", "ne"])
                        .default_value("eq")
                        .help("Join predicate")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("aggregate")
                .about("Aggregates one column of a CSV file, optionally grouped by another")
                .arg(table_arg("input", "Input CSV file"))
                .arg(schema_arg("schema"))
                .arg(field_arg("agg-field", "Field to aggregate, by index or name").required(true))
                .arg(field_arg("group-field", "Field to group by, by index or name"))
                .arg(
                    Arg::with_name("op")
                        .long("op")
                        .value_name("OP")
                        .possible_values(&["count", "sum", "avg", "min", "max"])
                        .help("Aggregate function")
                        .takes_value(true)
                        .required(true),
                ),
        )
}

fn table_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .value_name("FILE")
        .help(help)
        .takes_value(true)
        .required(true)
}

fn schema_arg(name: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .value_name("SCHEMA")
        .help("Columns of the file, e.g. id:int,name:string")
        .takes_value(true)
        .required(true)
}

fn field_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .value_name("FIELD")
        .help(help)
        .takes_value(true)
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, CrustyError> {
    matches
        .value_of(name)
        .ok_or_else(|| CrustyError::ValidationError(format!("missing --{}", name)))
}

/// Resolves a field argument given either as an index or as a column name of `schema`.
fn field(
    matches: &ArgMatches,
    name: &str,
    schema: &TableSchema,
) -> Result<Option<usize>, CrustyError> {
    matches
        .value_of(name)
        .map(|v| match v.parse::<usize>() {
            Ok(i) => Ok(i),
            Err(_) => schema.get_field_index(v).copied().ok_or_else(|| {
                CrustyError::ValidationError(format!("--{}: no column named {}", name, v))
            }),
        })
        .transpose()
}

fn required_field(
    matches: &ArgMatches,
    name: &str,
    schema: &TableSchema,
) -> Result<usize, CrustyError> {
    field(matches, name, schema)?
        .ok_or_else(|| CrustyError::ValidationError(format!("missing --{}", name)))
}

fn build_join(matches: &ArgMatches) -> Result<Box<dyn OpIterator>, CrustyError> {
    let left_schema = csv_utils::parse_schema(value(matches, "left-schema")?)?;
    let right_schema = csv_utils::parse_schema(value(matches, "right-schema")?)?;
    let left = csv_utils::load_table(value(matches, "left")?, left_schema)?;
    let right = csv_utils::load_table(value(matches, "right")?, right_schema)?;
    let op: SimplePredicateOp = value(matches, "op")?.parse()?;
    let left_index = required_field(matches, "left-field", left.get_schema())?;
    let right_index = required_field(matches, "right-field", right.get_schema())?;
    let join = Join::new(
        op,
        left_index,
        right_index,
        Box::new(left),
        Box::new(right),
    )?;
    debug!(
        "join on {:?} {} {:?}",
        join.left_join_field_name(),
        op,
        join.right_join_field_name()
    );
    Ok(Box::new(join))
}

fn build_aggregate(matches: &ArgMatches) -> Result<Box<dyn OpIterator>, CrustyError> {
    let schema = csv_utils::parse_schema(value(matches, "schema")?)?;
    let input = csv_utils::load_table(value(matches, "input")?, schema)?;
    let op: AggOp = value(matches, "op")?.parse()?;
    let agg_index = required_field(matches, "agg-field", input.get_schema())?;
    let group_index = field(matches, "group-field", input.get_schema())?;
    let aggregate = Aggregate::new(
        agg_index,
        group_index,
        op,
        Box::new(input),
    )?;
    debug!(
        "{} grouped by {:?}",
        aggregate.aggregate_field_name(),
        aggregate.group_field_name()
    );
    Ok(Box::new(aggregate))
}

/// Resolves the output settings: the config file if given, then the command line flags.
fn load_config(matches: &ArgMatches) -> Result<CliConfig, CrustyError> {
    let mut config = match matches.value_of("config") {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    if let Some(format) = matches.value_of("format") {
        config.format = format.to_string();
    }
    if matches.is_present("no-header") {
        config.header = false;
    }
    Ok(config)
}

/// Builds the requested plan, runs it and returns the rendered result.
fn run(matches: &ArgMatches) -> Result<String, CrustyError> {
    let config = load_config(matches)?;
    info!("Running with config: {:?}", config);
    let result_type = config.result_type()?;

    let plan = match matches.subcommand() {
        ("join", Some(sub)) => build_join(sub)?,
        ("aggregate", Some(sub)) => build_aggregate(sub)?,
        (other, _) => {
            return Err(CrustyError::ValidationError(format!(
                "unknown command {:?}",
                other
            )))
        }
    };

    let mut executor = Executor::new();
    executor.configure_query(plan);
    let result = executor.execute_with(result_type)?;
    Ok(result.result().to_string())
}

fn main() {
    // Configure log environment
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let matches = build_app().get_matches();
    match run(&matches) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
    info!("Terminated.");
}

use std::fs;
use std::io::{self, Read};
use std::process;

use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};
use log::{debug, error, LevelFilter};

use xmlrpc::server::MethodError;
use xmlrpc::{Client, Config, Error, GeneratorKind, Method, Param, Request, Response, Server, Type, Value};

/// Type names a parameter may be prefixed with, as in `int:5`.
const PARAM_TYPES: [&str; 13] = [
    "ex:i8",
    "ex:nil",
    "i4",
    "int",
    "i8",
    "double",
    "boolean",
    "string",
    "dateTime.iso8601",
    "base64",
    "array",
    "struct",
    "nil",
];

fn cli() -> Command {
    Command::new("xmlrpc")
        .version(crate_version!())
        .about("Calls, inspects and answers XML-RPC requests")
        .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::SetTrue).global(true).help("Verbose mode"))
        .arg(Arg::new("encoding").long("encoding").default_value("UTF-8").global(true).help("Encoding declared in generated documents"))
        .arg(Arg::new("dom").long("dom").action(ArgAction::SetTrue).global(true).help("Generate XML through an element tree"))
        .arg(
            Arg::new("precision")
                .long("precision")
                .value_parser(clap::value_parser!(usize))
                .default_value("14")
                .global(true)
                .help("Fractional digits written for doubles"),
        )
        .arg(Arg::new("bigint").long("bigint").action(ArgAction::SetTrue).global(true).help("Parse wire i8 values as big integers"))
        .subcommand(
            Command::new("call")
                .about("Call a remote method and print its result")
                .arg(Arg::new("url").required(true).help("Server endpoint, e.g. \"http://localhost:8080/RPC2\""))
                .arg(Arg::new("method").required(true).help("Method name, e.g. \"system.listMethods\""))
                .arg(Arg::new("params").num_args(0..).help("Parameters, as type:value or plain values"))
                .arg(
                    Arg::new("skip-system-lookup")
                        .long("skip-system-lookup")
                        .action(ArgAction::SetTrue)
                        .help("Don't ask the server for method signatures"),
                )
                .arg(Arg::new("user-agent").long("user-agent").help("User-Agent header to send")),
        )
        .subcommand(
            Command::new("methods")
                .about("List the methods of a remote server with their signatures")
                .arg(Arg::new("url").required(true)),
        )
        .subcommand(
            Command::new("parse")
                .about("Decode a methodCall or methodResponse document")
                .arg(Arg::new("file").help("Document to read, stdin when absent")),
        )
        .subcommand(Command::new("serve").about("Answer one CGI request from stdin with the demo methods"))
        .subcommand_required(true)
}

fn config(matches: &ArgMatches) -> Config {
    let generator = if matches.get_flag("dom") { GeneratorKind::Dom } else { GeneratorKind::Writer };
    let mut config = Config::default()
        .with_encoding(matches.get_one::<String>("encoding").map_or("UTF-8", String::as_str))
        .with_generator(generator);
    if let Some(precision) = matches.get_one::<usize>("precision") {
        config.precision = *precision;
    }
    config.use_bigint_for_i8 = matches.get_flag("bigint");
    config
}

/// `type:value` gives a typed parameter, anything else is guessed.
fn parse_param(arg: &str, config: &Config) -> xmlrpc::Result<Param> {
    for name in PARAM_TYPES.iter() {
        if let Some(text) = arg.strip_prefix(name).and_then(|rest| rest.strip_prefix(':')) {
            let ty: Type = name.parse()?;
            return Value::typed(text, ty, config).map(Param::Typed);
        }
    }
    let value = if let Ok(i) = arg.parse::<i64>() {
        Value::integer(i)
    } else if let Ok(f) = arg.parse::<f64>() {
        Value::double(f)
    } else if arg == "true" || arg == "false" {
        Value::boolean(arg == "true")
    } else {
        Value::text(arg)
    };
    Ok(Param::Native(value))
}

fn call(matches: &ArgMatches, config: Config) -> xmlrpc::Result<()> {
    let url = matches.get_one::<String>("url").map_or("", String::as_str);
    let method = matches.get_one::<String>("method").map_or("", String::as_str);
    let params = matches
        .get_many::<String>("params")
        .unwrap_or_default()
        .map(|arg| parse_param(arg, &config))
        .collect::<xmlrpc::Result<Vec<Param>>>()?;
    debug!("Calling {} on {} with {} parameter(s)", method, url, params.len());

    let mut client = Client::new(url);
    client.set_config(config.clone());
    client.set_skip_system_lookup(matches.get_flag("skip-system-lookup"));
    if let Some(agent) = matches.get_one::<String>("user-agent") {
        client.transport_mut().set_header("User-Agent", agent);
    }

    let value = client.call(method, params)?;
    println!("{}", value.to_xml_with(&config));
    Ok(())
}

fn methods(matches: &ArgMatches, config: Config) -> xmlrpc::Result<()> {
    let url = matches.get_one::<String>("url").map_or("", String::as_str);
    let mut client = Client::new(url);
    client.set_config(config);
    let signatures = client.introspector().signatures_for_each_method()?;
    for (method, signatures) in signatures {
        if signatures.is_empty() {
            println!("{}", method);
        }
        for signature in signatures {
            println!("{} {}({})", signature.return_type, method, signature.parameters.join(", "));
        }
    }
    Ok(())
}

fn parse(matches: &ArgMatches, config: Config) -> xmlrpc::Result<()> {
    let xml = match matches.get_one::<String>("file") {
        Some(file) => fs::read_to_string(file)?,
        None => {
            let mut xml = String::new();
            io::stdin().read_to_string(&mut xml)?;
            xml
        }
    };

    if xml.contains("<methodCall") {
        let mut request = Request::with_config(config.clone());
        if !request.load_xml(&xml) {
            if let Some(fault) = request.fault() {
                return Err(fault.clone().into());
            }
        }
        println!("method: {}", request.method().unwrap_or(""));
        for (value, ty) in request.params().iter().zip(request.types()) {
            println!("param ({}): {}", ty, value.to_xml_with(&config));
        }
    } else {
        let mut response = Response::with_config(config.clone());
        response.load_xml(&xml);
        match response.fault() {
            Some(fault) => println!("fault: {}", fault),
            None => {
                let value = response.return_value().cloned().unwrap_or_else(Value::nil);
                println!("return ({}): {}", value.get_type(), value.to_xml_with(&config));
            }
        }
    }
    Ok(())
}

fn demo_server(config: Config) -> xmlrpc::Result<Server> {
    let mut server = Server::with_config(config);
    let echo = ["int", "double", "boolean", "string", "dateTime.iso8601", "base64", "array", "struct", "nil"]
        .iter()
        .fold(Method::new("echo").help("Returns its only parameter"), |method, ty| {
            method.prototype(ty, &[*ty])
        })
        .handler(|params| Ok(params.first().cloned().unwrap_or_else(Value::nil)));
    server.add_function(echo, "demo")?;

    let add = Method::new("add")
        .help("Adds two integers")
        .prototype("int", &["int", "int"])
        .handler(|params| {
            let (a, b) = match params {
                [a, b] => (a.as_i64().unwrap_or(0), b.as_i64().unwrap_or(0)),
                _ => return Err(MethodError::server(623, "Calling parameters do not match signature")),
            };
            a.checked_add(b)
                .map(Value::integer)
                .ok_or_else(|| MethodError::server(700, "Integer overflow"))
        });
    server.add_function(add, "demo")?;
    Ok(server)
}

fn serve(config: Config) -> xmlrpc::Result<()> {
    let server = demo_server(config)?;
    let response = server.handle_http(io::stdin(), io::stdout())?;
    if let Some(fault) = response.fault() {
        debug!("Answered with fault {}", fault);
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let config = config(matches);
    match matches.subcommand() {
        Some(("call", sub)) => call(sub, config),
        Some(("methods", sub)) => methods(sub, config),
        Some(("parse", sub)) => parse(sub, config),
        Some(("serve", _)) => serve(config),
        _ => Ok(()),
    }
}

fn main() {
    let matches = cli().get_matches();

    // Init logging to DEBUG only if user required it
    let mut logger = env_logger::Builder::from_default_env();
    if matches.get_flag("verbose") {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

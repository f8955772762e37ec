use std::sync::Arc;

use serde::{Deserialize, Serialize};

use xmlrpc::server::Prototype;
use xmlrpc::{from_value, Client, Error, HttpReply, LocalTransport, Method, Param, Server, Transport, Type, Value};

/// Replies with one canned body and keeps what it was sent.
struct Canned {
    uri: Option<String>,
    headers: Vec<(String, String)>,
    reply: String,
}

impl Transport for Canned {
    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn set_uri(&mut self, uri: &str) {
        self.uri = Some(uri.to_string());
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn post(&mut self, _: &str) -> xmlrpc::Result<HttpReply> {
        Ok(HttpReply::ok(&self.reply))
    }
}

fn demo_server() -> Arc<Server> {
    let mut server = Server::new();
    server
        .add_function(
            Method::new("get")
                .prototype("int", &["int"])
                .prototype("string", &["array"])
                .handler(|params| match params[0].get_type() {
                    Type::Int => Ok(Value::text("int")),
                    _ => Ok(Value::text("array")),
                }),
            "",
        )
        .unwrap();
    server
        .add_function(
            Method::new("add")
                .help("Adds two integers")
                .prototype("int", &["int", "int"])
                .handler(|params| Ok(Value::integer(params.iter().filter_map(Value::as_i64).sum()))),
            "math",
        )
        .unwrap();
    server
        .add_function(
            Method::new("count")
                .prototype("int", &["struct"])
                .handler(|params| Ok(Value::integer(params[0].as_struct().map_or(0, |m| m.len() as i64)))),
            "",
        )
        .unwrap();
    Arc::new(server)
}

fn client(server: Arc<Server>) -> Client {
    Client::with_transport("local:", Box::new(LocalTransport::new(server)))
}

#[test]
fn end_to_end_with_mock_transport() {
    let reply = "<?xml version=\"1.0\"?>\n\
        <methodResponse><params><param><value><int>7</int></value></param></params></methodResponse>";
    let transport = Canned { uri: None, headers: Vec::new(), reply: reply.to_string() };
    let mut client = Client::with_transport("http://example.com/", Box::new(transport));
    client.set_skip_system_lookup(true);

    let result = client.call_native("foo.bar", &(1, "x")).unwrap();
    assert_eq!(Some(7), result.as_i64());

    let request = client.last_request().unwrap();
    assert_eq!(&[Value::integer(1), Value::text("x")], request.params());
    assert_eq!(&[Type::Int, Type::String], request.types());
}

#[test]
fn calls_through_local_server() {
    let mut client = client(demo_server());
    let sum = client.proxy("math").call_native("add", &(2, 40)).unwrap();
    assert_eq!(Value::integer(42), sum);
}

#[test]
fn dispatch_selects_prototype() {
    let mut client = client(demo_server());
    client.set_skip_system_lookup(true);
    assert_eq!(Value::text("int"), client.call("get", vec![Param::from(Value::integer(1))]).unwrap());
    assert_eq!(
        Value::text("array"),
        client.call("get", vec![Param::from(Value::array(vec![]))]).unwrap()
    );
    match client.call("get", vec![Param::from(Value::text("x"))]) {
        Err(Error::Fault { code, .. }) => assert_eq!(623, code),
        other => panic!("expected fault 623, got {:?}", other),
    }
}

#[test]
fn signature_lookup_types_empty_collections() {
    let mut client = client(demo_server());
    // An empty Vec is detected as an array; the remote signature says struct.
    let count = client.call("count", vec![Param::native(&Vec::<i32>::new()).unwrap()]).unwrap();
    assert_eq!(Value::integer(0), count);
    assert_eq!(&[Type::Struct], client.last_request().unwrap().types());
}

#[test]
fn multicall_partial_failure() {
    let mut client = client(demo_server());
    let calls = Value::array(vec![
        Value::structure(vec![
            ("methodName", Value::text("math.add")),
            ("params", Value::from(vec![1, 2])),
        ]),
        Value::structure(vec![
            ("methodName", Value::text("nope.missing")),
            ("params", Value::array(vec![])),
        ]),
        Value::structure(vec![
            ("methodName", Value::text("system.methodHelp")),
            ("params", Value::from(vec!["math.add"])),
        ]),
    ]);
    let results = client.call("system.multicall", vec![Param::from(calls)]).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(3, results.len());
    assert_eq!(Value::integer(3), results[0]);
    assert_eq!(
        Value::structure(vec![
            ("faultCode", Value::integer(620)),
            ("faultString", Value::text("Method \"nope.missing\" does not exist")),
        ]),
        results[1]
    );
    assert_eq!(Value::text("Adds two integers"), results[2]);
}

#[test]
fn introspection_over_multicall() {
    let mut client = client(demo_server());
    let methods = client.introspector().list_methods().unwrap();
    assert!(methods.contains(&"math.add".to_string()));

    let all = client.introspector().signatures_for_each_method().unwrap();
    let add = &all["math.add"];
    assert_eq!("int", add[0].return_type);
    assert_eq!(vec!["int".to_string(), "int".to_string()], add[0].parameters);
    assert_eq!(2, all["get"].len());
}

#[test]
fn method_signature_shape() {
    let server = demo_server();
    let signature = Prototype::from_names("int", &["int", "int"]).to_value();
    let mut client = client(server);
    let returned = client.call_native("system.methodSignature", &("math.add",)).unwrap();
    assert_eq!(Value::array(vec![signature]), returned);
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    label: String,
}

#[test]
fn records_round_trip_through_server() {
    let mut server = Server::new();
    server
        .add_function(
            Method::new("echo")
                .prototype("struct", &["struct"])
                .handler(|params| Ok(params[0].clone())),
            "",
        )
        .unwrap();
    let mut client = client(Arc::new(server));
    client.set_skip_system_lookup(true);

    let point = Point { x: 1, y: -2, label: "origin-ish".to_string() };
    let returned = client.call_native("echo", &(&point,)).unwrap();
    assert_eq!(point, from_value::<Point>(returned).unwrap());
}

#[test]
fn http_errors_are_distinct_from_faults() {
    struct Failing;

    impl Transport for Failing {
        fn uri(&self) -> Option<&str> {
            Some("http://example.com/")
        }
        fn set_uri(&mut self, _: &str) {}
        fn headers(&self) -> &[(String, String)] {
            &[]
        }
        fn set_header(&mut self, _: &str, _: &str) {}
        fn post(&mut self, _: &str) -> xmlrpc::Result<HttpReply> {
            Ok(HttpReply { status: 500, reason: "Internal Server Error".to_string(), body: Vec::new() })
        }
    }

    let mut client = Client::with_transport("http://example.com/", Box::new(Failing));
    client.set_skip_system_lookup(true);
    match client.call("x", Vec::new()) {
        Err(Error::Http { status, reason }) => {
            assert_eq!(500, status);
            assert_eq!("Internal Server Error", reason);
        }
        other => panic!("expected an HTTP error, got {:?}", other),
    }
}

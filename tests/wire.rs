use xmlrpc::{Config, Fault, GeneratorKind, Method, Request, Response, Server, Type, Value};

const XXE: &str = "<?xml version=\"1.0\"?>\n\
    <!DOCTYPE methodCall [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]>\n";

#[test]
fn doctype_is_rejected_for_requests_and_responses() {
    let mut request = Request::default();
    let xml = format!("{}<methodCall><methodName>&xxe;</methodName></methodCall>", XXE);
    assert!(!request.load_xml(&xml));
    assert_eq!(631, request.fault().unwrap().code());

    let mut response = Response::default();
    let xml = format!(
        "{}<methodResponse><params><param><value>&xxe;</value></param></params></methodResponse>",
        XXE
    );
    assert!(!response.load_xml(&xml));
    assert_eq!(651, response.fault().unwrap().code());
}

#[test]
fn struct_members_without_name_or_value_are_dropped() {
    let xml = "<value><struct>\
        <member><value><int>9</int></value></member>\
        <member><name>foo</name><value><int>0</int></value></member>\
        <member><name>skipped</name></member>\
        <member><name>bar</name><value><int>1</int></value></member>\
        </struct></value>";
    let value = Value::from_xml(xml, &Config::default()).unwrap();
    assert_eq!(
        Value::structure(vec![("foo", Value::integer(0)), ("bar", Value::integer(1))]),
        value
    );
}

#[test]
fn array_requires_data() {
    let empty = Value::from_xml("<value><array><data/></array></value>", &Config::default()).unwrap();
    assert_eq!(Some(&[][..]), empty.as_array());
    assert!(Value::from_xml("<value><array/></value>", &Config::default()).is_err());
}

#[test]
fn fault_messages_default_from_code() {
    let xml = "<methodResponse><fault><value><struct>\
        <member><name>faultCode</name><value><int>610</int></value></member>\
        <member><name>faultString</name><value><string></string></value></member>\
        </struct></value></fault></methodResponse>";
    let mut fault = Fault::default();
    assert!(fault.load_xml(xml).unwrap());
    assert_eq!(610, fault.code());
    assert_eq!("Invalid method class", fault.message());

    assert_eq!("Unknown Error", Fault::new(12345, "").message());
}

#[test]
fn fault_response_round_trip() {
    let fault = Fault::new(623, "");
    let mut response = Response::default();
    assert!(!response.load_xml(&fault.save_xml()));
    assert_eq!(Some(&fault), response.fault());
}

#[test]
fn request_types_survive_the_wire() {
    let mut request = Request::new("types.check");
    request.add_param(Value::integer(1));
    request.add_typed(Value::integer(2), Type::Double).unwrap();
    request.add_param(Value::text("x"));
    request.add_param(Value::nil());

    let mut parsed = Request::default();
    assert!(parsed.load_xml(&request.save_xml()));
    assert_eq!(Some("types.check"), parsed.method());
    assert_eq!(&[Type::Int, Type::Double, Type::String, Type::Nil], parsed.types());
    assert_eq!(Some(2.0), parsed.params()[1].as_f64());
}

#[test]
fn both_generators_produce_equivalent_documents() {
    let value = Value::structure(vec![
        ("name", Value::text("a < b & c")),
        ("items", Value::from(vec![1, 2, 3])),
        ("empty", Value::text("")),
    ]);
    for kind in [GeneratorKind::Writer, GeneratorKind::Dom] {
        let config = Config::default().with_generator(kind);
        let mut response = Response::with_config(config.clone());
        response.set_return_value(value.clone());

        let mut parsed = Response::with_config(config);
        assert!(parsed.load_xml(&response.save_xml()), "generator {:?}", kind);
        assert_eq!(Some(&value), parsed.return_value());
    }
}

#[test]
fn cgi_exchange() {
    let mut server = Server::new();
    server
        .add_function(
            Method::new("ping").prototype("string", &[]).handler(|_| Ok(Value::text("pong"))),
            "",
        )
        .unwrap();

    let body = Request::new("ping").save_xml();
    let mut out = Vec::new();
    let response = server.handle_http(body.as_bytes(), &mut out).unwrap();
    assert_eq!(Some("pong"), response.return_value().and_then(Value::as_str));

    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Content-Type: text/xml; charset=utf-8\r\n\r\n"));
    assert!(out.contains("<string>pong</string>"));
}

#[test]
fn cgi_exchange_with_empty_body() {
    let server = Server::new();
    let mut out = Vec::new();
    let response = server.handle_http(&b""[..], &mut out).unwrap();
    assert_eq!(630, response.fault().unwrap().code());
}

#[test]
fn server_encoding_is_declared() {
    let mut server = Server::new();
    server.set_encoding("ISO-8859-1");
    let response = server.handle_xml("<methodCall><methodName>system.listMethods</methodName></methodCall>");
    assert!(response.save_xml().contains("encoding=\"ISO-8859-1\""));
}

use xml_mapper::convert::{Base64Converter, DateConverter, DateTimeConverter, EnumConverter, MappedEnum};
use xml_mapper::{
    ConversionPolicy, DeserializeOptions, Deserializer, Element, Error, FieldMapping, Mappable,
    NamePolicy, Serializer, TypeDescriptor, WriteOptions, describe, from_element, from_str,
    to_element, to_string,
};

use chrono::{NaiveDate, NaiveDateTime};

// ── Models ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Status {
    #[default]
    Active,
    Retired,
}

impl MappedEnum for Status {
    const VARIANTS: &'static [(&'static str, Self)] =
        &[("active", Status::Active), ("retired", Status::Retired)];
}

/// Same shape under different tags.
#[derive(Debug, Clone, PartialEq, Default)]
struct Contact {
    name: String,
    email: Option<String>,
}

impl Mappable for Contact {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Inherited
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("name", "name", |c: &Self| &c.name, |c: &mut Self| &mut c.name)
                .required(),
            FieldMapping::value_child("email", "email", |c: &Self| &c.email, |c: &mut Self| {
                &mut c.email
            }),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Position {
    lat: f64,
    lon: f64,
}

impl Mappable for Position {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("position")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("lat", "lat", |p: &Self| &p.lat, |p: &mut Self| &mut p.lat).required(),
            FieldMapping::attribute("lon", "lon", |p: &Self| &p.lon, |p: &mut Self| &mut p.lon).required(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Reading {
    at: u32,
    value: f64,
}

impl Mappable for Reading {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("reading")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("at", "at", |r: &Self| &r.at, |r: &mut Self| &mut r.at),
            FieldMapping::attribute("value", "value", |r: &Self| &r.value, |r: &mut Self| &mut r.value)
                .required(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Note {
    lang: Option<String>,
    text: String,
}

impl Mappable for Note {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("note")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("lang", "lang", |n: &Self| &n.lang, |n: &mut Self| &mut n.lang),
            FieldMapping::value("text", |n: &Self| &n.text, |n: &mut Self| &mut n.text),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Station {
    id: u32,
    label: Option<String>,
    status: Status,
    commissioned: Option<NaiveDate>,
    elevation: Option<f64>,
    owner: Option<Contact>,
    operator: Option<Contact>,
    position: Option<Position>,
    readings: Vec<Reading>,
    notes: Vec<Note>,
}

impl Mappable for Station {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("station")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("id", "id", |s: &Self| &s.id, |s: &mut Self| &mut s.id).required(),
            FieldMapping::attribute("label", "label", |s: &Self| &s.label, |s: &mut Self| &mut s.label),
            FieldMapping::attribute_with(
                "status",
                "status",
                |s: &Self| &s.status,
                |s: &mut Self| &mut s.status,
                EnumConverter::<Status>::new(),
            ),
            FieldMapping::attribute_with(
                "commissioned",
                "commissioned",
                |s: &Self| &s.commissioned,
                |s: &mut Self| &mut s.commissioned,
                DateConverter::default(),
            ),
            FieldMapping::value_child("elevation", "elevation", |s: &Self| &s.elevation, |s: &mut Self| {
                &mut s.elevation
            }),
            FieldMapping::optional_child("owner", "owner", |s: &Self| &s.owner, |s: &mut Self| &mut s.owner),
            FieldMapping::optional_child("operator", "operator", |s: &Self| &s.operator, |s: &mut Self| {
                &mut s.operator
            }),
            FieldMapping::optional_child("position", "position", |s: &Self| &s.position, |s: &mut Self| {
                &mut s.position
            }),
            FieldMapping::list("readings", |s: &Self| &s.readings, |s: &mut Self| &mut s.readings),
            FieldMapping::wrapped_list("notes", "notes", |s: &Self| &s.notes, |s: &mut Self| &mut s.notes),
        ]
    }
}

fn sample_station() -> Station {
    Station {
        id: 7,
        label: Some("Roof & mast".to_string()),
        status: Status::Retired,
        commissioned: NaiveDate::from_ymd_opt(2019, 4, 2),
        elevation: Some(12.5),
        owner: Some(Contact {
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
        }),
        operator: Some(Contact {
            name: "Bob".to_string(),
            email: None,
        }),
        position: Some(Position { lat: 42.36, lon: -71.06 }),
        readings: vec![Reading { at: 1, value: 280.25 }, Reading { at: 2, value: 281.0 }],
        notes: vec![
            Note {
                lang: Some("en".to_string()),
                text: "first <draft>".to_string(),
            },
            Note {
                lang: None,
                text: "second".to_string(),
            },
        ],
    }
}

// ── Round trip ─────────────────────────────────────────────────────────────

#[test]
fn test_round_trip_every_field_kind() {
    let station = sample_station();
    let element = to_element(&station, None).unwrap();
    let decoded: Station = from_element(&element, NamePolicy::Strict).unwrap();
    assert_eq!(station, decoded);
}

#[test]
fn test_round_trip_through_text() {
    let station = sample_station();
    let xml = to_string(&station).unwrap();
    let decoded: Station = from_str(&xml).unwrap();
    assert_eq!(station, decoded);

    let pretty = Serializer::new(WriteOptions::default().indent(2).declaration(true))
        .serialize(&station)
        .unwrap();
    assert!(pretty.starts_with("<?xml"));
    let decoded: Station = from_str(&pretty).unwrap();
    assert_eq!(station, decoded);
}

#[test]
fn test_round_trip_defaults() {
    let station = Station::default();
    let decoded: Station = from_element(&to_element(&station, None).unwrap(), NamePolicy::Strict).unwrap();
    assert_eq!(station, decoded);
}

// ── Serialization shape ────────────────────────────────────────────────────

#[test]
fn test_children_follow_declaration_order() {
    let element = to_element(&sample_station(), None).unwrap();
    let names: Vec<&str> = element.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        ["elevation", "owner", "operator", "position", "reading", "reading", "notes"]
    );
    let attrs: Vec<&str> = element.attributes.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(attrs, ["id", "label", "status", "commissioned"]);
    assert_eq!(element.attribute("status"), Some("retired"));
    assert_eq!(element.attribute("commissioned"), Some("2019-04-02"));
}

#[test]
fn test_none_values_are_omitted() {
    let station = Station {
        id: 1,
        ..Station::default()
    };
    let element = to_element(&station, None).unwrap();
    assert_eq!(element.attribute("label"), None);
    assert_eq!(element.attribute("commissioned"), None);
    assert!(element.first_descendant("elevation").is_none());
    assert!(element.first_descendant("owner").is_none());
    // empty lists: no items, wrapper still written
    assert!(element.first_descendant("reading").is_none());
    assert!(element.first_descendant("notes").unwrap().children.is_empty());
}

#[test]
fn test_inherited_child_takes_field_name() {
    let element = to_element(&sample_station(), None).unwrap();
    let owner = element.first_descendant("owner").unwrap();
    assert_eq!(owner.attribute("name"), Some("Ada"));
    assert_eq!(owner.first_descendant("email").unwrap().text(), "ada@example.com");
    let operator = element.first_descendant("operator").unwrap();
    assert_eq!(operator.attribute("name"), Some("Bob"));
    assert!(operator.children.is_empty());
}

#[test]
fn test_compact_text_output() {
    let note = Note {
        lang: Some("en".to_string()),
        text: "a & b".to_string(),
    };
    assert_eq!(to_string(&note).unwrap(), r#"<note lang="en">a &amp; b</note>"#);
}

// ── Required / optional ────────────────────────────────────────────────────

#[test]
fn test_required_attribute_missing() {
    let err = from_str::<Station>("<station/>").unwrap_err();
    assert_eq!(
        err,
        Error::RequiredFieldMissing {
            field: "id",
            xml_name: "id"
        }
    );
}

#[test]
fn test_optional_attribute_missing_keeps_default() {
    let station: Station = from_str(r#"<station id="3"/>"#).unwrap();
    assert_eq!(station.id, 3);
    assert_eq!(station.label, None);
    assert_eq!(station.status, Status::Active);
    assert_eq!(station.owner, None);
    assert!(station.readings.is_empty());
}

#[test]
fn test_required_attribute_in_nested_child() {
    let err = from_str::<Station>(r#"<station id="3"><owner/></station>"#).unwrap_err();
    assert_eq!(
        err,
        Error::RequiredFieldMissing {
            field: "name",
            xml_name: "name"
        }
    );
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Strict {
    code: String,
    detail: Option<Position>,
    tags: Vec<Note>,
}

impl Mappable for Strict {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("strict")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::value_child("code", "code", |s: &Self| &s.code, |s: &mut Self| &mut s.code)
                .required(),
            FieldMapping::optional_child("detail", "position", |s: &Self| &s.detail, |s: &mut Self| {
                &mut s.detail
            })
            .required(),
            FieldMapping::wrapped_list("tags", "tags", |s: &Self| &s.tags, |s: &mut Self| &mut s.tags)
                .required(),
        ]
    }
}

#[test]
fn test_required_value_child_child_and_wrapper() {
    let err = from_str::<Strict>("<strict/>").unwrap_err();
    assert_eq!(
        err,
        Error::RequiredFieldMissing {
            field: "code",
            xml_name: "code"
        }
    );

    let err = from_str::<Strict>("<strict><code>x</code></strict>").unwrap_err();
    assert_eq!(
        err,
        Error::RequiredFieldMissing {
            field: "detail",
            xml_name: "position"
        }
    );

    let err = from_str::<Strict>(r#"<strict><code>x</code><position lat="1" lon="2"/></strict>"#).unwrap_err();
    assert_eq!(
        err,
        Error::RequiredFieldMissing {
            field: "tags",
            xml_name: "tags"
        }
    );

    let ok: Strict =
        from_str(r#"<strict><code>x</code><position lat="1" lon="2"/><tags/></strict>"#).unwrap();
    assert_eq!(ok.code, "x");
    assert_eq!(ok.detail, Some(Position { lat: 1.0, lon: 2.0 }));
    assert!(ok.tags.is_empty());
}

// ── Lists ──────────────────────────────────────────────────────────────────

#[test]
fn test_wrapped_list_keeps_document_order() {
    let xml = r#"<station id="1"><notes><note>A</note><note>B</note><note>C</note></notes></station>"#;
    let station: Station = from_str(xml).unwrap();
    let texts: Vec<&str> = station.notes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, ["A", "B", "C"]);
}

#[test]
fn test_wrapped_list_takes_only_direct_item_children() {
    let xml = r#"<station id="1"><notes><note>A</note><other/><group><note>nested</note></group><note>B</note></notes></station>"#;
    let station: Station = from_str(xml).unwrap();
    let texts: Vec<&str> = station.notes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, ["A", "B"]);
}

#[test]
fn test_list_scans_whole_subtree_in_document_order() {
    let xml = r#"
        <station id="1">
            <reading at="1" value="10"/>
            <batch>
                <reading at="2" value="20"/>
                <deeper><reading at="3" value="30"/></deeper>
            </batch>
            <reading at="4" value="40"/>
        </station>"#;
    let station: Station = from_str(xml).unwrap();
    let order: Vec<u32> = station.readings.iter().map(|r| r.at).collect();
    assert_eq!(order, [1, 2, 3, 4]);
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Detached {
    readings: Option<Vec<Reading>>,
}

impl Mappable for Detached {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("detached")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![FieldMapping::list("readings", |d: &Self| &d.readings, |d: &mut Self| {
            &mut d.readings
        })]
    }
}

#[test]
fn test_uninitialized_collection() {
    let err = from_str::<Detached>(r#"<detached><reading value="1"/></detached>"#).unwrap_err();
    assert_eq!(err, Error::UninitializedCollection("readings"));

    let err = to_element(&Detached::default(), None).unwrap_err();
    assert_eq!(err, Error::UninitializedCollection("readings"));
}

#[test]
fn test_preallocated_collection_is_filled() {
    let element = Element::parse_str(r#"<detached><reading at="5" value="1.5"/></detached>"#).unwrap();
    let mut detached = Detached {
        readings: Some(vec![Reading { at: 0, value: 0.0 }]),
    };
    Deserializer::default().deserialize_into(&element, &mut detached).unwrap();
    assert_eq!(
        detached.readings,
        Some(vec![Reading { at: 0, value: 0.0 }, Reading { at: 5, value: 1.5 }])
    );
}

#[test]
fn test_deserialize_into_leaves_target_on_failure() {
    let element = Element::parse_str(r#"<detached><reading at="5" value="1.5"/><reading at="6"/></detached>"#).unwrap();
    let mut detached = Detached {
        readings: Some(Vec::new()),
    };
    let err = Deserializer::default().deserialize_into(&element, &mut detached).unwrap_err();
    assert_eq!(
        err,
        Error::RequiredFieldMissing {
            field: "value",
            xml_name: "value"
        }
    );
    assert_eq!(detached.readings, Some(Vec::new()));
}

// ── Root names ─────────────────────────────────────────────────────────────

#[test]
fn test_strict_root_name_mismatch() {
    let err = from_str::<Station>(r#"<notstation id="1"/>"#).unwrap_err();
    assert_eq!(
        err,
        Error::NameMismatch {
            expected: "station".to_string(),
            found: "notstation".to_string()
        }
    );
    assert!(err.is_recoverable());
}

#[test]
fn test_lenient_skips_root_check() {
    let element = Element::parse_str(r#"<notstation id="9"/>"#).unwrap();
    let station: Station = from_element(&element, NamePolicy::Lenient).unwrap();
    assert_eq!(station.id, 9);

    // still fails for other reasons
    let element = Element::parse_str("<notstation/>").unwrap();
    let err = from_element::<Station>(&element, NamePolicy::Lenient).unwrap_err();
    assert!(matches!(err, Error::RequiredFieldMissing { field: "id", .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_inherited_type_needs_a_name_at_the_root() {
    let element = Element::parse_str(r#"<someone name="Cy"/>"#).unwrap();
    let err = from_element::<Contact>(&element, NamePolicy::Strict).unwrap_err();
    assert!(matches!(err, Error::UnmappedType(_)));

    let contact: Contact = from_element(&element, NamePolicy::Lenient).unwrap();
    assert_eq!(contact.name, "Cy");

    let err = to_element(&contact, None).unwrap_err();
    assert!(matches!(err, Error::UnmappedType(_)));

    let element = to_element(&contact, Some("someone")).unwrap();
    assert_eq!(element.name, "someone");
}

#[test]
fn test_root_name_override() {
    let reading = Reading { at: 1, value: 2.0 };
    let element = to_element(&reading, Some("sample")).unwrap();
    assert_eq!(element.name, "sample");
    let xml = Serializer::default().serialize_as(&reading, "sample").unwrap();
    assert_eq!(xml, r#"<sample at="1" value="2"/>"#);
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Beacon {
    site: Option<Position>,
}

impl Mappable for Beacon {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("beacon")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![FieldMapping::optional_child("site", "site", |b: &Self| &b.site, |b: &mut Self| &mut b.site)]
    }
}

#[test]
fn test_named_child_under_other_field_name() {
    let beacon: Beacon = from_str(r#"<beacon><site lat="1.5" lon="2.5"/></beacon>"#).unwrap();
    assert_eq!(beacon.site, Some(Position { lat: 1.5, lon: 2.5 }));

    let xml = to_string(&beacon).unwrap();
    assert_eq!(xml, r#"<beacon><site lat="1.5" lon="2.5"/></beacon>"#);
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Roster {
    people: Vec<Contact>,
}

impl Mappable for Roster {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("roster")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![FieldMapping::list("people", |r: &Self| &r.people, |r: &mut Self| &mut r.people)]
    }
}

#[test]
fn test_list_of_inherited_type_is_unmapped() {
    let err = from_str::<Roster>("<roster/>").unwrap_err();
    assert!(matches!(err, Error::UnmappedType(_)));
}

// ── Conversion ─────────────────────────────────────────────────────────────

#[test]
fn test_conversion_error_is_fatal_by_default() {
    let err = from_str::<Station>(r#"<station id="seven"/>"#).unwrap_err();
    assert_eq!(
        err,
        Error::Conversion {
            field: "id",
            raw_value: "seven".to_string(),
            target_type: "u32"
        }
    );
}

#[test]
fn test_conversion_error_from_converter() {
    let err = from_str::<Station>(r#"<station id="1" status="lost"/>"#).unwrap_err();
    assert!(matches!(
        err,
        Error::Conversion {
            field: "status",
            ..
        }
    ));
}

#[test]
fn test_substitute_default_policy() {
    let element = Element::parse_str(r#"<station id="1" status="lost"><elevation>high</elevation></station>"#).unwrap();
    let de = Deserializer::new(DeserializeOptions::default().conversion_policy(ConversionPolicy::SubstituteDefault));
    let station: Station = de.deserialize(&element).unwrap();
    assert_eq!(station.id, 1);
    assert_eq!(station.status, Status::Active);
    assert_eq!(station.elevation, None);
}

#[test]
fn test_enum_names_match_case_insensitively() {
    let station: Station = from_str(r#"<station id="1" status="RETIRED"/>"#).unwrap();
    assert_eq!(station.status, Status::Retired);
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Blob {
    data: Vec<u8>,
}

impl Mappable for Blob {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("blob")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![FieldMapping::value_with(
            "data",
            |b: &Self| &b.data,
            |b: &mut Self| &mut b.data,
            Base64Converter,
        )]
    }
}

#[test]
fn test_base64_value() {
    let blob = Blob {
        data: b"hello".to_vec(),
    };
    assert_eq!(to_string(&blob).unwrap(), "<blob>aGVsbG8=</blob>");
    assert_eq!(from_str::<Blob>("<blob>aGVsbG8=</blob>").unwrap(), blob);

    let err = from_str::<Blob>("<blob>!!!</blob>").unwrap_err();
    assert!(matches!(err, Error::Conversion { field: "data", .. }));
}

// ── Tables ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
struct TwoValues {
    a: String,
    b: String,
}

impl Mappable for TwoValues {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("two")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::value("a", |t: &Self| &t.a, |t: &mut Self| &mut t.a),
            FieldMapping::value("b", |t: &Self| &t.b, |t: &mut Self| &mut t.b),
        ]
    }
}

#[test]
fn test_two_value_mappings_rejected() {
    assert!(matches!(describe::<TwoValues>(), Err(Error::InvalidMapping(_))));
    assert!(matches!(from_str::<TwoValues>("<two>x</two>"), Err(Error::InvalidMapping(_))));
}

#[test]
fn test_describe_lists_fields_in_order() {
    let table = describe::<Station>().unwrap();
    assert_eq!(table.descriptor, TypeDescriptor::Named("station"));
    let members: Vec<&str> = table.fields.iter().map(|f| f.member()).collect();
    assert_eq!(
        members,
        [
            "id",
            "label",
            "status",
            "commissioned",
            "elevation",
            "owner",
            "operator",
            "position",
            "readings",
            "notes"
        ]
    );
    assert!(!table.fields[0].is_optional());
    assert_eq!(table.fields[8].xml_name(), None);
    assert_eq!(table.fields[9].xml_name(), Some("notes"));
}

// ── Text values ────────────────────────────────────────────────────────────

#[test]
fn test_whitespace_only_value_round_trips() {
    let note = Note {
        lang: None,
        text: "  ".to_string(),
    };
    let xml = to_string(&note).unwrap();
    assert_eq!(xml, "<note>  </note>");
    assert_eq!(from_str::<Note>(&xml).unwrap(), note);
}

#[test]
fn test_whitespace_between_children_is_dropped() {
    let leaf = Element::parse_str("<a> </a>").unwrap();
    assert_eq!(leaf.text, Some(" ".to_string()));

    let parent = Element::parse_str("<a>\n  <b> </b>\n</a>").unwrap();
    assert_eq!(parent.text, None);
    assert_eq!(parent.children[0].text, Some(" ".to_string()));
}

#[test]
fn test_empty_optional_text_reads_back_as_none() {
    let station = Station {
        id: 1,
        label: Some(String::new()),
        ..Station::default()
    };
    let element = to_element(&station, None).unwrap();
    assert_eq!(element.attribute("label"), None);
    let decoded: Station = from_element(&element, NamePolicy::Strict).unwrap();
    assert_eq!(decoded.label, None);

    let decoded: Station = from_str(r#"<station id="1" label=""/>"#).unwrap();
    assert_eq!(decoded.label, None);
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Attachment {
    data: Option<Vec<u8>>,
}

impl Mappable for Attachment {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("attachment")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![FieldMapping::attribute_with(
            "data",
            "data",
            |a: &Self| &a.data,
            |a: &mut Self| &mut a.data,
            Base64Converter,
        )]
    }
}

#[test]
fn test_empty_optional_bytes_read_back_as_none() {
    let attachment = Attachment { data: Some(Vec::new()) };
    let xml = to_string(&attachment).unwrap();
    assert_eq!(xml, "<attachment/>");
    assert_eq!(from_str::<Attachment>(&xml).unwrap(), Attachment { data: None });

    let attachment = Attachment {
        data: Some(b"hi".to_vec()),
    };
    assert_eq!(from_str::<Attachment>(&to_string(&attachment).unwrap()).unwrap(), attachment);
}

// ── Timestamps ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
struct Log {
    at: NaiveDateTime,
    seen: Option<NaiveDateTime>,
}

impl Mappable for Log {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("log")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute_with(
                "at",
                "at",
                |l: &Self| &l.at,
                |l: &mut Self| &mut l.at,
                DateTimeConverter::default(),
            )
            .required(),
            FieldMapping::value_child_with(
                "seen",
                "seen",
                |l: &Self| &l.seen,
                |l: &mut Self| &mut l.seen,
                DateTimeConverter::new("%d/%m/%Y %H:%M"),
            ),
        ]
    }
}

fn timestamp(day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

#[test]
fn test_datetime_formats() {
    let xml = r#"<log at="2024-01-01T06:30:00"><seen>02/01/2024 07:45</seen></log>"#;
    let log: Log = from_str(xml).unwrap();
    assert_eq!(
        log,
        Log {
            at: timestamp(1, 6, 30),
            seen: Some(timestamp(2, 7, 45)),
        }
    );
    assert_eq!(to_string(&log).unwrap(), xml);
}

#[test]
fn test_datetime_accepts_rfc3339() {
    let log: Log = from_str(r#"<log at="2024-01-01T06:30:00+02:00"/>"#).unwrap();
    assert_eq!(log.at, timestamp(1, 4, 30));

    let log: Log = from_str(r#"<log at="2024-01-01T06:30:00Z"/>"#).unwrap();
    assert_eq!(log.at, timestamp(1, 6, 30));
}

#[test]
fn test_optional_datetime_empty_or_absent() {
    let log: Log = from_str(r#"<log at="2024-01-01T06:30:00"><seen/></log>"#).unwrap();
    assert_eq!(log.seen, None);

    let log: Log = from_str(r#"<log at="2024-01-01T06:30:00"/>"#).unwrap();
    assert_eq!(log.seen, None);
    assert_eq!(to_string(&log).unwrap(), r#"<log at="2024-01-01T06:30:00"/>"#);
}

#[test]
fn test_datetime_rejects_garbage() {
    let err = from_str::<Log>(r#"<log at="yesterday"/>"#).unwrap_err();
    assert!(matches!(err, Error::Conversion { field: "at", .. }));

    let err = from_str::<Log>(r#"<log at="2024-01-01T06:30:00"><seen>2024-01-02</seen></log>"#).unwrap_err();
    assert!(matches!(err, Error::Conversion { field: "seen", .. }));
}

// ── Parsing ────────────────────────────────────────────────────────────────

#[test]
fn test_parse_folds_references_into_text() {
    let element = Element::parse_str("<a>a&amp;b&#65;&#x42; &lt;c&gt;</a>").unwrap();
    assert_eq!(element.text(), "a&bAB <c>");

    let element = Element::parse_str(r#"<a k="x &amp; &quot;y&quot;"/>"#).unwrap();
    assert_eq!(element.attribute("k"), Some(r#"x & "y""#));
}

#[test]
fn test_parse_folds_cdata_into_text() {
    let element = Element::parse_str("<a>x <![CDATA[<b>&amp;</b>]]> y</a>").unwrap();
    assert_eq!(element.text(), "x <b>&amp;</b> y");
    assert!(element.children.is_empty());
}

#[test]
fn test_parse_skips_markup_that_is_not_content() {
    let xml = r#"<?xml version="1.0"?>
<!DOCTYPE a>
<!-- before -->
<a><?pi x?>t<!-- inside -->u</a>
<!-- after -->"#;
    let element = Element::parse_str(xml).unwrap();
    assert_eq!(element.name, "a");
    assert_eq!(element.text(), "tu");
    assert!(element.children.is_empty());
}

#[test]
fn test_parse_rejects_malformed_documents() {
    for xml in ["", "<a/><b/>", "<a>", "<a><b></a>", "<a>&bogus;</a>"] {
        let result = Element::parse_str(xml);
        assert!(matches!(result, Err(Error::Xml(_))), "{:?} gave {:?}", xml, result);
    }
}

// ── Concurrency ────────────────────────────────────────────────────────────

#[test]
fn test_concurrent_calls_resolve_names_independently() {
    let xml = to_string(&sample_station()).unwrap();
    let root = Element::parse_str(&xml).unwrap();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let root = &root;
            scope.spawn(move || {
                for _ in 0..50 {
                    let station: Station = from_element(root, NamePolicy::Strict).unwrap();
                    assert_eq!(station.owner.as_ref().unwrap().name, "Ada");
                    let tag = format!("contact{}", i);
                    let element = to_element(station.operator.as_ref().unwrap(), Some(tag.as_str())).unwrap();
                    assert_eq!(element.name, tag);
                }
            });
        }
    });
}

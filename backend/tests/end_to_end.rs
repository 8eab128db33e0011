//! End-to-end tests: mapping file + input file through the public API.

use nestmap::{
    load_mapping_file, parse_file_auto, to_json_pretty, transform_batch, transform_files, BatchOptions, EngineConfig,
    MappingError, PipelineError,
};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

const MOTOR_MAPPING: &str = "\
Type;Variable;prefix;Path;DataType;samed;Default
;ref;;Quote;string;QuoteRef;
;name;;Quote/Customer;string;;
;age;;Quote/Customer;number;;30
;vip;;Quote/Customer;boolean;;
list;make;veh;Quote/Vehicles;string;;
list;year;veh;Quote/Vehicles;number;;
list;;claim;Quote/Claims;date;;
";

const MOTOR_INPUT: &str = "\
QuoteRef;Name;Age;VIP;Veh1Make;Veh2Make;Veh5Year;Claim1;Claim2
Q-1;Ann;41;Yes;Volvo;Saab;2019;2020-01-05;
Q-2;Bob;;no;;;;;
";

#[test]
fn motor_quotes_end_to_end() {
    let fx = Fixture::new();
    let mapping = fx.write("motor.csv", MOTOR_MAPPING);
    let input = fx.write("quotes.csv", MOTOR_INPUT);

    let out = transform_files(&mapping, &input, &EngineConfig::default()).unwrap();
    assert_eq!(out.documents, 2);

    let first = &out.envelope["Quote"][0]["Quote"];
    assert_eq!(first["ref"], json!("Q-1"));
    assert_eq!(first["Customer"], json!({"name": "Ann", "age": 41.0, "vip": true}));

    let vehicles = first["Vehicles"].as_array().unwrap();
    assert_eq!(vehicles.len(), 5);
    assert_eq!(vehicles[0], json!({"vehmake": "Volvo", "vehyear": 0}));
    assert_eq!(vehicles[1], json!({"vehmake": "Saab", "vehyear": 0}));
    assert_eq!(vehicles[2], json!({"vehmake": "", "vehyear": 0}));
    assert_eq!(vehicles[3], json!({"vehmake": "", "vehyear": 0}));
    assert_eq!(vehicles[4], json!({"vehmake": "", "vehyear": 2019.0}));

    assert_eq!(first["Claims"], json!([{"claim1": "2020-01-05"}, {"claim2": ""}]));

    let second = &out.envelope["Quote"][1]["Quote"];
    assert_eq!(second["Customer"], json!({"name": "Bob", "age": 30.0, "vip": false}));
}

#[test]
fn json_mapping_and_json_input() {
    let fx = Fixture::new();
    let mapping = fx.write(
        "mapping.json",
        r#"[
            {"Variable": "name", "Path": "customer"},
            {"Type": "list", "prefix": "item", "Variable": "amt", "Path": "cart/items", "DataType": "number"}
        ]"#,
    );
    let input = fx.write("input.json", r#"[{"name": "Acme", "item1amt": "10", "item3amt": 30}]"#);

    let out = transform_files(&mapping, &input, &EngineConfig::default()).unwrap();
    assert_eq!(
        out.envelope,
        json!({"Quote": [{
            "customer": {"name": "Acme"},
            "cart": {"items": [{"itemamt": 10.0}, {"itemamt": 0}, {"itemamt": 30.0}]}
        }]})
    );
}

#[test]
fn output_is_byte_identical_across_runs_and_modes() {
    let fx = Fixture::new();
    let mapping = fx.write("motor.csv", MOTOR_MAPPING);
    let input = fx.write("quotes.csv", MOTOR_INPUT);

    let config = EngineConfig::default();
    let table = load_mapping_file(&mapping, &config).unwrap();
    let records = parse_file_auto(&input).unwrap().records;

    let parallel = BatchOptions {
        parallel: true,
        ..BatchOptions::default()
    };
    let sequential = BatchOptions {
        parallel: false,
        ..BatchOptions::default()
    };

    let a = to_json_pretty(&transform_batch(&table, &records, &parallel).envelope).unwrap();
    let b = to_json_pretty(&transform_batch(&table, &records, &parallel).envelope).unwrap();
    let c = to_json_pretty(&transform_batch(&table, &records, &sequential).envelope).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn empty_path_row_is_rejected_with_row_number() {
    let fx = Fixture::new();
    let mapping = fx.write("bad.csv", "Variable,Path\nname,customer\nage,\n");
    let input = fx.write("input.csv", "name,age\nAcme,3\n");

    let err = transform_files(&mapping, &input, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Mapping(MappingError::EmptyPath { row: 2 })));
}

#[test]
fn strict_mode_rejects_path_conflicts() {
    let fx = Fixture::new();
    let mapping = fx.write("conflict.csv", "Variable,Path\nname,customer\nfirst,customer/name\n");

    let lenient = load_mapping_file(&mapping, &EngineConfig::default());
    assert!(lenient.is_ok());

    let strict = EngineConfig {
        strict_paths: true,
        ..EngineConfig::default()
    };
    let err = load_mapping_file(&mapping, &strict).unwrap_err();
    assert!(matches!(err, MappingError::PathConflicts(ref c) if c.len() == 1));
}

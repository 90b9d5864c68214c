use std::fs;
use std::path::Path;

use minas_dashboard::aggregate::aggregate_window;
use minas_dashboard::loader::{load_department_forecast, load_department_monthly};
use minas_dashboard::report::{choropleth_collection, write_joined_csv};
use minas_dashboard::{CollisionPolicy, RegistryCache, normalize, reconcile};
use serde_json::json;

const DEPARTMENTS: [&str; 33] = [
    "AMAZONAS",
    "ANTIOQUIA",
    "ARAUCA",
    "ARCHIPIELAGO DE SAN ANDRES, PROVIDENCIA Y SANTA CATALINA",
    "ATLANTICO",
    "SANTAFE DE BOGOTA D.C",
    "BOLIVAR",
    "BOYACA",
    "CALDAS",
    "CAQUETA",
    "CASANARE",
    "CAUCA",
    "CESAR",
    "CHOCO",
    "CORDOBA",
    "CUNDINAMARCA",
    "GUAINIA",
    "GUAVIARE",
    "HUILA",
    "LA GUAJIRA",
    "MAGDALENA",
    "META",
    "NARIÑO",
    "NORTE DE SANTANDER",
    "PUTUMAYO",
    "QUINDIO",
    "RISARALDA",
    "SANTANDER",
    "SUCRE",
    "TOLIMA",
    "VALLE DEL CAUCA",
    "VAUPES",
    "VICHADA",
];

fn write_geojson(path: &Path) {
    let features: Vec<_> = DEPARTMENTS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "type": "Feature",
                "properties": { "DPTO": format!("{:02}", i + 1), "NOMBRE_DPT": name },
                "geometry": { "type": "Polygon", "coordinates": [] }
            })
        })
        .collect();
    let fc = json!({ "type": "FeatureCollection", "features": features });
    fs::write(path, fc.to_string()).unwrap();
}

#[test]
fn forecast_table_joins_onto_all_33_departments() {
    let dir = tempfile::tempdir().unwrap();
    let geo = dir.path().join("deptos.geojson");
    write_geojson(&geo);
    let csv = dir.path().join("forecast_depto_Q1_2024.csv");
    fs::write(
        &csv,
        "departamento,pred_Q1_2024\n\
         Antioquia,14.2\n\
         Bogotá D.C.,0.4\n\
         N. de Santander,9.1\n\
         Valle,3.0\n\
         San Andrés,0.0\n\
         Nariño,7.5\n\
         Exterior,1.0\n",
    )
    .unwrap();

    let mut cache = RegistryCache::new();
    let registry = cache.get_or_build(&geo).unwrap();
    assert_eq!(registry.len(), 33);

    let metrics = load_department_forecast(&csv).unwrap().rows;
    let rec = reconcile(&registry, &metrics, CollisionPolicy::LastWriteWins);

    assert_eq!(rec.joined.len(), 33);
    assert_eq!(rec.filled_count(), 27);
    assert_eq!(rec.unmatched.iter().collect::<Vec<_>>(), vec!["EXTERIOR"]);

    let bogota = rec
        .joined
        .iter()
        .find(|r| r.canonical_key == normalize("Bogotá"))
        .unwrap();
    assert_eq!(bogota.value, 0.4);
    assert_eq!(bogota.display_label, "SANTAFE DE BOGOTA D.C");

    let fc = choropleth_collection(&registry, &rec);
    let narino = fc["features"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["properties"]["DPTO_KEY"] == "NARINO")
        .unwrap();
    assert_eq!(narino["properties"]["value"], 7.5);

    let out = dir.path().join("mapa.csv");
    write_joined_csv(&out, &rec.joined).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 34);
}

#[test]
fn monthly_history_feeds_the_reconciler() {
    let dir = tempfile::tempdir().unwrap();
    let geo = dir.path().join("deptos.geojson");
    write_geojson(&geo);

    let mut body = String::from("fecha,departamento,victimas\n");
    for year in [2022, 2023] {
        for month in 1..=12 {
            body.push_str(&format!("{year}-{month:02}-01,Meta,1\n"));
            body.push_str(&format!("{year}-{month:02}-01,Guajira,2\n"));
        }
    }
    let csv = dir.path().join("serie_depto_mensual.csv");
    fs::write(&csv, body).unwrap();

    let rows = load_department_monthly(&csv).unwrap().rows;
    let mut cache = RegistryCache::new();
    let registry = cache.get_or_build(&geo).unwrap();

    let rec = reconcile(&registry, &aggregate_window(&rows, 12), CollisionPolicy::Sum);
    let value_of = |key: &str| {
        rec.joined
            .iter()
            .find(|r| r.canonical_key.as_str() == key)
            .map(|r| r.value)
    };
    assert_eq!(value_of("META"), Some(12.0));
    assert_eq!(value_of("LA GUAJIRA"), Some(24.0));
    assert!(rec.unmatched.is_empty());
    assert_eq!(rec.joined.len(), 33);

    let six = reconcile(&registry, &aggregate_window(&rows, 6), CollisionPolicy::Sum);
    assert_eq!(six.total(), 18.0);
}

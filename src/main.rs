use std::error::Error;
use std::io::{self, Write};

use minas_dashboard::aggregate::{MonthlyRow, aggregate_window, trailing_window};
use minas_dashboard::config::Config;
use minas_dashboard::loader::{self, ForecastPoint, SeriesPoint};
use minas_dashboard::report::{self, MapSummary};
use minas_dashboard::{DataError, MetricRow, Reconciliation, RegistryCache, reconcile};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Everything loaded from the pipeline outputs. Rebuilt on refresh.
struct Dataset {
    series: Vec<SeriesPoint>,
    forecast: Vec<ForecastPoint>,
    departments: Vec<MetricRow>,
    monthly: Option<Vec<MonthlyRow>>,
}

struct App {
    config: Config,
    cache: RegistryCache,
    data: Option<Dataset>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut app = App {
        config: Config::from_env(),
        cache: RegistryCache::new(),
        data: None,
    };

    loop {
        println!("Landmine Victims Dashboard (Colombia, 2024-Q1)");
        println!("[1] Load data files");
        println!("[2] National history and forecast");
        println!("[3] Top departments (Q1 forecast)");
        println!("[4] Department map: Q1 forecast");
        println!("[5] Department map: trailing {} months", app.config.window_months);
        println!("[6] Export files");
        println!("[7] Refresh data");
        println!("[0] Exit");
        print!("Enter Choice: ");
        io::stdout().flush()?;

        let mut choice = String::new();
        if io::stdin().read_line(&mut choice)? == 0 {
            return Ok(());
        }

        let outcome = match choice.trim() {
            "1" => app.load(),
            "2" => app.national(),
            "3" => app.top_departments(),
            "4" => app.forecast_map(),
            "5" => app.history_map(),
            "6" => app.export(),
            "7" => app.refresh(),
            "0" => return Ok(()),
            _ => {
                println!("Invalid choice. Please try again.");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
        }
        println!();
    }
}

impl App {
    fn load(&mut self) -> Result<(), DataError> {
        let cfg = &self.config;

        let series = loader::load_national_series(&cfg.national_series_path())?;
        println!(
            "National series... ({} rows loaded, {} skipped)",
            series.rows.len(),
            series.skipped
        );
        let forecast = loader::load_national_forecast(&cfg.national_forecast_path())?;
        println!(
            "National forecast... ({} rows loaded, {} skipped)",
            forecast.rows.len(),
            forecast.skipped
        );
        let departments = loader::load_department_forecast(&cfg.department_forecast_path())?;
        println!(
            "Department forecast... ({} rows loaded, {} skipped)",
            departments.rows.len(),
            departments.skipped
        );
        let monthly = match loader::load_department_monthly(&cfg.department_monthly_path()) {
            Ok(loaded) => {
                println!(
                    "Department monthly series... ({} rows loaded, {} skipped)",
                    loaded.rows.len(),
                    loaded.skipped
                );
                Some(loaded.rows)
            }
            Err(DataError::MissingFile(path)) => {
                warn!(path = %path.display(), "no department monthly series, historical layer disabled");
                None
            }
            Err(e) => return Err(e),
        };

        self.data = Some(Dataset {
            series: series.rows,
            forecast: forecast.rows,
            departments: departments.rows,
            monthly,
        });
        Ok(())
    }

    fn dataset(&self) -> Option<&Dataset> {
        if self.data.is_none() {
            println!("No data loaded. Please choose [1] Load data files first.");
        }
        self.data.as_ref()
    }

    fn national(&self) -> Result<(), DataError> {
        let Some(data) = self.dataset() else {
            return Ok(());
        };
        let rows = report::combine_national(&data.series, &data.forecast);
        println!("National history and forecast");
        println!();
        println!("{}", report::render_national(&rows));
        println!();
        println!("Note: 95% intervals derived from the selected model's validation error.");
        Ok(())
    }

    fn top_departments(&self) -> Result<(), DataError> {
        let Some(data) = self.dataset() else {
            return Ok(());
        };
        let top = report::top_departments(&data.departments, self.config.top_n);
        println!("Top-{} departments (Q1-2024, predicted)", self.config.top_n);
        println!();
        println!("{}", report::render_top(&top));
        Ok(())
    }

    fn forecast_layer(&mut self) -> Result<Option<Reconciliation>, DataError> {
        if self.dataset().is_none() {
            return Ok(None);
        }
        let registry = self.cache.get_or_build(&self.config.geojson)?;
        let Some(data) = self.data.as_ref() else {
            return Ok(None);
        };
        Ok(Some(reconcile(&registry, &data.departments, self.config.collision)))
    }

    fn history_layer(&mut self) -> Result<Option<(Reconciliation, String)>, DataError> {
        if self.dataset().is_none() {
            return Ok(None);
        }
        let registry = self.cache.get_or_build(&self.config.geojson)?;
        let months = self.config.window_months;
        let Some(monthly) = self.data.as_ref().and_then(|d| d.monthly.as_ref()) else {
            println!("No historical layer available.");
            return Ok(None);
        };
        let Some(window) = trailing_window(monthly, months) else {
            println!("No historical layer available.");
            return Ok(None);
        };
        let metrics = aggregate_window(monthly, months);
        let label = format!("last {} months ({} to {})", months, window.start, window.end);
        Ok(Some((reconcile(&registry, &metrics, self.config.collision), label)))
    }

    fn forecast_map(&mut self) -> Result<(), DataError> {
        let Some(rec) = self.forecast_layer()? else {
            return Ok(());
        };
        println!("Department map: predicted victims Q1-2024");
        println!();
        println!("{}", report::render_map(&rec));
        Ok(())
    }

    fn history_map(&mut self) -> Result<(), DataError> {
        let Some((rec, label)) = self.history_layer()? else {
            return Ok(());
        };
        println!("Department map: victims, {}", label);
        println!();
        println!("{}", report::render_map(&rec));
        Ok(())
    }

    fn export(&mut self) -> Result<(), DataError> {
        let Some(forecast) = self.forecast_layer()? else {
            return Ok(());
        };
        let registry = self.cache.get_or_build(&self.config.geojson)?;
        let Some(data) = self.data.as_ref() else {
            return Ok(());
        };
        let cfg = &self.config;

        let national = report::combine_national(&data.series, &data.forecast);
        report::write_national_csv(&cfg.out_path("serie_nacional_forecast.csv"), &national)?;
        report::write_joined_csv(&cfg.out_path("mapa_forecast_Q1_2024.csv"), &forecast.joined)?;
        report::write_choropleth_geojson(
            &cfg.out_path("mapa_forecast_Q1_2024.geojson"),
            &registry,
            &forecast,
        )?;
        let mut summaries = vec![MapSummary::new("forecast_Q1_2024", None, &forecast)];

        if let Some(monthly) = data.monthly.as_ref() {
            if let Some(window) = trailing_window(monthly, cfg.window_months) {
                let metrics = aggregate_window(monthly, cfg.window_months);
                let history = reconcile(&registry, &metrics, cfg.collision);
                report::write_joined_csv(&cfg.out_path("mapa_historico.csv"), &history.joined)?;
                report::write_choropleth_geojson(
                    &cfg.out_path("mapa_historico.geojson"),
                    &registry,
                    &history,
                )?;
                summaries.push(MapSummary::new(
                    format!("historico_{}m", cfg.window_months),
                    Some(window.end),
                    &history,
                ));
            }
        }
        report::write_json(&cfg.out_path("resumen.json"), &summaries)?;

        info!(dir = %cfg.out_dir.display(), layers = summaries.len(), "exports written");
        println!("Outputs saved to {}", cfg.out_dir.display());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DataError> {
        self.cache.invalidate();
        self.data = None;
        println!("Cache cleared, reloading...");
        self.load()
    }
}

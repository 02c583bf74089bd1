use care_metrics::core::normalize::NormalizeOptions;
use care_metrics::core::report::{self, AnalysisReport};
use care_metrics::core::{aggregate, benchmark, classify, outlier};
use care_metrics::core::{Storage, Thresholds};
use care_metrics::domain::model::ServiceRecord;
use care_metrics::utils::validation::Validate;
use care_metrics::utils::{error::Result, logger};
use care_metrics::{AnalysisSession, CliConfig, LocalStorage, TomlConfig};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting care-metrics CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    match run(&config) {
        Ok(()) => {
            tracing::info!("✅ Analysis completed successfully!");
        }
        Err(e) => {
            tracing::error!("❌ Analysis failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run(config: &CliConfig) -> Result<()> {
    // 門檻值來源:TOML 檔優先,否則使用命令列旗標
    let thresholds: Box<dyn Thresholds> = match &config.config {
        Some(path) => {
            let toml_config = TomlConfig::from_file(path)?;
            toml_config.validate()?;
            tracing::info!("Using thresholds from '{}'", path);
            Box::new(toml_config)
        }
        None => Box::new(config.clone()),
    };

    let storage = LocalStorage::new(".".to_string());
    let bytes = storage.read_file(&config.input)?;

    let session = AnalysisSession::from_bytes(
        &config.input,
        &bytes,
        &NormalizeOptions::from_thresholds(&*thresholds),
    )?;

    let selection = config.selection();
    let subset = session.filtered(&selection);
    if subset.is_empty() {
        tracing::warn!("No services match the current filters");
    }

    let policy = thresholds.outliers();
    let risk = thresholds.risk();

    let provider = config.provider.as_ref().map(|p| {
        (
            aggregate::provider_profile(&subset, p),
            benchmark::compare_provider(&subset, p, &benchmark::CORE_MEASURES),
        )
    });

    let indicators: Vec<_> = ServiceRecord::measure_names(&subset)
        .iter()
        .map(|measure| aggregate::indicator_summary(&subset, measure, &policy))
        .collect();

    let findings = outlier::scan_metrics(&subset, &outlier::default_watchlist(), &policy);
    let concerns = classify::classify_all(&subset, &risk);

    let analysis = AnalysisReport {
        source: session.source().to_string(),
        selection,
        overview: report::sector_overview(&subset),
        provider: provider.as_ref().map(|(profile, _)| profile.clone()),
        comparisons: provider
            .map(|(_, comparisons)| comparisons)
            .unwrap_or_default(),
        indicators,
        findings,
        concerns,
        warnings: session.warnings().to_vec(),
    };

    if config.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_summary(&analysis);
    }

    if let Some(export_path) = &config.export_path {
        export(export_path, &analysis)?;
        println!("📁 Exports written to: {}", export_path);
    }

    Ok(())
}

fn print_summary(analysis: &AnalysisReport) {
    let overview = &analysis.overview;
    println!("📊 Sector overview — {} service(s)", overview.services);
    println!(
        "   Avg RN Care Compliance (%):    {}",
        report::fmt1(overview.mean_rn_compliance_pct)
    );
    println!(
        "   Avg Total Care Compliance (%): {}",
        report::fmt1(overview.mean_total_care_compliance_pct)
    );
    println!(
        "   Services with non-compliance rating: {}",
        overview.non_compliant_services
    );

    if let Some(profile) = &analysis.provider {
        println!();
        println!(
            "🏢 Provider profile: {} ({} service(s), {} suburb(s))",
            profile.provider_name, profile.services, profile.distinct_suburbs
        );
        println!(
            "   Overall Star Rating:  {}",
            report::fmt1(profile.mean_overall_rating)
        );
        println!(
            "   RN Care Compliance:   {}",
            report::fmt1(profile.mean_rn_compliance_pct)
        );
        println!(
            "   Total Care Compliance: {}",
            report::fmt1(profile.mean_total_care_compliance_pct)
        );
        for row in &analysis.comparisons {
            println!(
                "   {} — provider {} vs sector median {} (rank {})",
                row.measure,
                report::fmt1(row.provider_mean),
                report::fmt1(row.sector_median),
                report::fmt1(row.percentile_rank)
            );
        }
    }

    println!();
    if analysis.concerns.is_empty() {
        println!("✅ No services met serious-concern criteria");
    } else {
        println!(
            "⚠️  {} service(s) met serious-concern criteria:",
            analysis.concerns.len()
        );
        for flag in &analysis.concerns {
            let reasons = flag
                .reasons
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            println!("   {} ({}) — {}", flag.service_name, flag.service_id, reasons);
        }
    }

    if !analysis.findings.is_empty() {
        println!(
            "📈 {} statistical outlier(s) across watched metrics",
            analysis.findings.len()
        );
    }
    if !analysis.warnings.is_empty() {
        println!(
            "ℹ️  {} data-quality warning(s) collected during load",
            analysis.warnings.len()
        );
    }
}

fn export(export_path: &str, analysis: &AnalysisReport) -> Result<()> {
    let storage = LocalStorage::new(export_path.to_string());

    let mut concerns_csv = Vec::new();
    report::write_concerns_csv(&mut concerns_csv, &analysis.concerns)?;
    storage.write_file("concerns.csv", &concerns_csv)?;

    let mut findings_csv = Vec::new();
    report::write_findings_csv(&mut findings_csv, &analysis.findings)?;
    storage.write_file("outliers.csv", &findings_csv)?;

    Ok(())
}

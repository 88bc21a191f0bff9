// src/render/page.rs
// Full dashboard page: status bar, alerts, strategy picker, backtest form, upload zones, results

use crate::alerts::Alert;
use crate::backtest::{BacktestInputs, SourceMode};
use crate::render::form::render_parameter_form;
use crate::render::html::escape;
use crate::render::results::render_results_panel;
use crate::session::AppSession;
use crate::status::StatusBoard;
use crate::strategy::StrategySelector;
use crate::upload::{UploadZone, XLSX_MIME, XLS_MIME};
use std::fmt::Write;

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@4.6.2/dist/css/bootstrap.min.css";
const FONT_AWESOME_CSS: &str = "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/5.15.4/css/all.min.css";

const SOURCE_CHOICES: [(&str, &str); 2] = [("excel", "Excel upload"), ("database", "Database")];

const PAGE_STYLE: &str = r#"
    body { background: #f5f7fa; }
    .stat-card { background: #fff; border-radius: 8px; padding: 12px; text-align: center; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
    .stat-title { font-size: 0.85em; color: #6c757d; }
    .stat-value { font-size: 1.4em; font-weight: 600; }
    .upload-zone { border: 2px dashed #adb5bd; border-radius: 8px; padding: 16px; text-align: center; }
    .upload-zone.dragover { border-color: #007bff; background: #e9f2ff; }
    .upload-zone.has-file { border-color: #28a745; border-style: solid; }
    .loading-spinner { width: 40px; height: 40px; margin: 0 auto; border: 4px solid #dee2e6; border-top-color: #007bff; border-radius: 50%; animation: spin 1s linear infinite; }
    @keyframes spin { to { transform: rotate(360deg); } }
"#;

pub fn render_page(session: &AppSession, running: bool) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Backtest Dashboard</title>{refresh}
    <link rel="stylesheet" href="{bootstrap}">
    <link rel="stylesheet" href="{icons}">
    <style>{style}</style>
</head>
<body>
<nav class="navbar navbar-dark bg-dark mb-3">
    <span class="navbar-brand"><i class="fas fa-chart-line"></i> Backtest Dashboard</span>
    {status}
</nav>
<div class="container-fluid">
    {alerts}
    <div class="row">
        <div class="col-lg-4">
            {strategy}
            {uploads}
        </div>
        <div class="col-lg-8">
            {backtest}
        </div>
    </div>
    <div id="backtest-results">{results}</div>
</div>
</body>
</html>"#,
        // Poll while a backtest or an upload is in flight so it settles without a manual reload
        refresh = if running || session.uploads_in_progress() { r#"
    <meta http-equiv="refresh" content="2">"# } else { "" },
        bootstrap = BOOTSTRAP_CSS,
        icons = FONT_AWESOME_CSS,
        style = PAGE_STYLE,
        status = render_status_bar(&session.status),
        alerts = render_alerts(session.alerts.visible()),
        strategy = render_strategy_card(&session.selector),
        uploads = [&session.price_upload, &session.stock_upload]
            .iter()
            .map(|zone| render_upload_zone(zone))
            .collect::<String>(),
        backtest = render_backtest_card(session, running),
        results = render_results_panel(&session.results),
    )
}

fn render_status_bar(board: &StatusBoard) -> String {
    let mut html = String::from(r#"<div class="system-status">"#);
    for badge in board.badges() {
        let _ = write!(
            html,
            r#"<span class="mr-3 text-light">{}: <span class="badge {}">{}</span></span>"#,
            badge.kind.title(),
            badge.class,
            badge.label
        );
    }
    if let (Some(active), Some(total)) = (board.active_strategies, board.total_strategies) {
        let _ = write!(
            html,
            r#"<span class="mr-3 text-light">Strategies: {}/{}</span>"#,
            active, total
        );
    }
    if let Some(time) = board.system_time.as_deref() {
        let _ = write!(html, r#"<small class="text-muted">{}</small>"#, escape(time));
    }
    html.push_str("</div>");
    html
}

fn render_alerts(alerts: &[Alert]) -> String {
    let mut html = String::from(r#"<div id="alert-container">"#);
    for alert in alerts {
        let _ = write!(
            html,
            r#"<div class="alert alert-{level} alert-dismissible fade show" role="alert">{message}<form method="post" action="/alerts/{id}/dismiss" class="d-inline"><button type="submit" class="close" aria-label="Close"><span aria-hidden="true">&times;</span></button></form></div>"#,
            level = alert.level.css(),
            message = escape(&alert.message),
            id = alert.id,
        );
    }
    html.push_str("</div>");
    html
}

fn render_strategy_card(selector: &StrategySelector) -> String {
    let mut options = String::new();
    for option in selector.options() {
        let selected = if !option.value.is_empty() && selector.selected() == Some(option.value.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            escape(&option.value),
            selected,
            escape(&option.label)
        );
    }

    format!(
        r#"<div class="card mb-3"><div class="card-header"><h5><i class="fas fa-cogs"></i> Strategy</h5></div><div class="card-body"><form method="post" action="/strategy"><div class="form-group"><select class="form-control" id="strategy-select" name="strategy" onchange="this.form.submit()">{options}</select></div><button type="submit" class="btn btn-outline-primary btn-sm">Load parameters</button></form><form method="post" action="/strategies/reload" class="mt-2"><button type="submit" class="btn btn-link btn-sm p-0"><i class="fas fa-sync"></i> Reload strategies</button></form></div></div>"#,
    )
}

fn render_source_select(name: &str, current: &SourceMode) -> String {
    let mut html = format!(r#"<select class="form-control" id="{0}" name="{0}">"#, name);
    let mut known = false;
    for (value, label) in SOURCE_CHOICES {
        let selected = if current.as_str() == value {
            known = true;
            " selected"
        } else {
            ""
        };
        let _ = write!(html, r#"<option value="{}"{}>{}</option>"#, value, selected, label);
    }
    if !known {
        let _ = write!(
            html,
            r#"<option value="{0}" selected>{0}</option>"#,
            escape(current.as_str())
        );
    }
    html.push_str("</select>");
    html
}

fn render_backtest_card(session: &AppSession, running: bool) -> String {
    let inputs: &BacktestInputs = &session.inputs;
    let button = if running {
        r#"<button type="submit" class="btn btn-primary" disabled><span class="spinner-border spinner-border-sm"></span> Running...</button>"#
    } else {
        r#"<button type="submit" class="btn btn-primary"><i class="fas fa-play"></i> Run backtest</button>"#
    };

    format!(
        r#"<div class="card mb-3"><div class="card-header"><h5><i class="fas fa-flask"></i> Backtest</h5></div><div class="card-body"><form method="post" action="/backtest" id="backtest-form">
<div class="row">
<div class="col-md-6 form-group"><label for="data_source">Price data source</label>{data_source}</div>
<div class="col-md-6 form-group"><label for="stock_source">Stock list source</label>{stock_source}</div>
<div class="col-md-4 form-group"><label for="start_date">Start date</label><input type="date" class="form-control" id="start_date" name="start_date" value="{start}"></div>
<div class="col-md-4 form-group"><label for="end_date">End date</label><input type="date" class="form-control" id="end_date" name="end_date" value="{end}"></div>
<div class="col-md-4 form-group"><label for="initial_capital">Initial capital</label><input type="number" class="form-control" id="initial_capital" name="initial_capital" value="{capital}" step="any"></div>
</div>
<div id="strategy-parameters">{parameters}</div>
{button}
</form></div></div>"#,
        data_source = render_source_select("data_source", &inputs.data_source),
        stock_source = render_source_select("stock_source", &inputs.stock_source),
        start = escape(&inputs.start_date),
        end = escape(&inputs.end_date),
        capital = escape(&inputs.initial_capital),
        parameters = render_parameter_form(session.form.as_ref()),
        button = button,
    )
}

fn render_upload_zone(zone: &UploadZone) -> String {
    let slot = zone.slot();
    let mut classes = String::from("upload-zone");
    if zone.has_file() {
        classes.push_str(" has-file");
    }
    if zone.is_dragover() {
        classes.push_str(" dragover");
    }

    let name = match zone.file_name() {
        Some(name) => format!(r#"<p class="file-name mb-2"><i class="fas fa-file-excel"></i> {}</p>"#, escape(name)),
        None => r#"<p class="file-name text-muted mb-2">Drop an Excel file here or choose one</p>"#.to_string(),
    };

    let progress = match zone.progress() {
        Some(percent) => format!(
            r#"<div class="progress mb-2"><div class="progress-bar" role="progressbar" style="width: {0:.0}%" aria-valuenow="{0:.0}" aria-valuemin="0" aria-valuemax="100">{0:.0}%</div></div>"#,
            percent
        ),
        None => String::new(),
    };

    format!(
        r#"<div class="card mb-3"><div class="card-header"><h6>{title}</h6></div><div class="card-body"><form method="post" action="/upload/{slot}" enctype="multipart/form-data" class="{classes}" id="{slot}-zone">{name}{progress}<input type="hidden" name="source" value="picker"><input type="file" class="form-control-file mb-2" name="file" accept=".xlsx,.xls,{xlsx},{xls}"><button type="submit" class="btn btn-outline-secondary btn-sm"><i class="fas fa-upload"></i> Upload</button></form></div></div>"#,
        title = slot.title(),
        slot = slot.field_name(),
        classes = classes,
        name = name,
        progress = progress,
        xlsx = XLSX_MIME,
        xls = XLS_MIME,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ResultsPanel;
    use crate::types::StrategyDescriptor;
    use std::time::Duration;

    fn session() -> AppSession {
        AppSession::new(Duration::from_secs(5))
    }

    #[test]
    fn test_initial_page() {
        let html = render_page(&session(), false);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Checking..."));
        assert!(html.contains(r#"action="/upload/price_file""#));
        assert!(html.contains(r#"action="/upload/stock_file""#));
        assert!(html.contains(r#"<option value="excel" selected>"#));
        assert!(!html.contains("disabled"));
        assert!(!html.contains("loading-spinner\"></div><p"));
    }

    #[test]
    fn test_selected_strategy_marked() {
        let mut s = session();
        s.selector.replace(vec![
            StrategyDescriptor {
                name: "ma_cross".into(),
                display_name: "MA <Cross>".into(),
            },
            StrategyDescriptor {
                name: "rsi".into(),
                display_name: "RSI".into(),
            },
        ]);
        let html = render_strategy_card(&s.selector);
        assert!(html.contains(r#"<option value="">Please choose a strategy</option>"#));
        assert!(html.contains("MA &lt;Cross&gt;"));
        assert!(!html.contains(" selected"));
    }

    #[test]
    fn test_running_disables_button_and_shows_spinner() {
        let mut s = session();
        s.results = ResultsPanel::InProgress;
        let html = render_page(&s, true);
        assert!(html.contains("disabled"));
        assert!(html.contains(r#"http-equiv="refresh""#));
        assert!(html.contains("Backtest running, please wait..."));
    }

    #[test]
    fn test_alerts_escaped_with_dismiss_form() {
        let mut s = session();
        let id = s.alerts.push(crate::alerts::AlertLevel::Danger, "Backtest failed: <oops>");
        let html = render_alerts(s.alerts.visible());
        assert!(html.contains("alert-danger"));
        assert!(html.contains("Backtest failed: &lt;oops&gt;"));
        assert!(html.contains(&format!("/alerts/{}/dismiss", id)));
    }

    #[test]
    fn test_unknown_source_kept_selected() {
        let html = render_source_select("stock_source", &SourceMode::parse("api"));
        assert!(html.contains(r#"<option value="api" selected>api</option>"#));
    }
}

// src/render/results.rs
// Backtest result views: summary cards, trade table, chart placeholder

use crate::format::{
    format_count, format_date, format_money, format_percentage, format_price, format_ratio,
};
use crate::render::html::{escape, sign_class};
use crate::session::ResultsPanel;
use crate::types::{BacktestResult, TradeRecord};
use std::fmt::Write;

pub fn render_results_panel(panel: &ResultsPanel) -> String {
    match panel {
        ResultsPanel::Empty => String::new(),
        ResultsPanel::InProgress => r#"<div class="backtest-progress"><div class="text-center"><div class="loading-spinner"></div><p class="mt-2">Backtest running, please wait...</p></div></div>"#.to_string(),
        ResultsPanel::Rendered(result) => render_results(result),
    }
}

pub fn render_results(result: &BacktestResult) -> String {
    let mut html = String::from(r#"<div class="fade-in">"#);
    html.push_str(&render_summary(result));
    if !result.trade_records.is_empty() {
        html.push_str(&render_trade_table(&result.trade_records));
    }
    if result.has_charts() {
        html.push_str(&render_chart_placeholder(result));
    }
    html.push_str("</div>");
    html
}

fn stat_card(title: &str, class: &str, value: &str) -> String {
    let class = if class.is_empty() {
        "stat-value".to_string()
    } else {
        format!("stat-value {}", class)
    };
    format!(
        r#"<div class="col-md-2"><div class="stat-card"><div class="stat-title">{}</div><div class="{}">{}</div></div></div>"#,
        title, class, value
    )
}

fn render_summary(result: &BacktestResult) -> String {
    let cards = [
        stat_card(
            "Total trades",
            "",
            &format_count(result.total_trades.map(|n| n as f64)),
        ),
        stat_card("Win rate", "", &format_percentage(result.win_rate)),
        stat_card(
            "Total return",
            sign_class(result.total_profit_loss_rate),
            &format_percentage(result.total_profit_loss_rate),
        ),
        stat_card(
            "Max drawdown",
            "text-danger",
            &format_percentage(result.max_drawdown_rate),
        ),
        stat_card("Sharpe ratio", "", &format_ratio(result.sharpe_ratio)),
        stat_card(
            "Net P&amp;L",
            sign_class(result.total_profit_loss),
            &format_money(result.total_profit_loss),
        ),
    ];

    format!(
        r#"<div class="row mb-4"><div class="col-12"><div class="card"><div class="card-header"><h5><i class="fas fa-chart-pie"></i> Backtest summary</h5></div><div class="card-body"><div class="row">{}</div></div></div></div></div>"#,
        cards.concat()
    )
}

fn render_trade_row(trade: &TradeRecord) -> String {
    let (badge, direction) = if trade.is_buy() {
        ("badge-success", "Buy")
    } else {
        ("badge-danger", "Sell")
    };

    format!(
        concat!(
            "<tr>",
            "<td>{}</td><td>{}</td><td>{}</td>",
            r#"<td><span class="badge {}">{}</span></td>"#,
            "<td>{}</td><td>{}</td><td>{}</td>",
            r#"<td class="{}">{}</td>"#,
            r#"<td class="{}">{}</td>"#,
            r#"<td class="{} font-weight-bold">{}</td>"#,
            "</tr>"
        ),
        format_date(trade.entry_date.as_deref()),
        format_date(trade.exit_date.as_deref()),
        escape(trade.stock_id.as_deref().unwrap_or("-")),
        badge,
        direction,
        format_price(trade.entry_price),
        format_price(trade.exit_price),
        format_count(trade.shares),
        sign_class(trade.profit_loss),
        format_money(trade.profit_loss),
        sign_class(trade.profit_loss_rate),
        format_percentage(trade.profit_loss_rate),
        sign_class(trade.net_profit_loss),
        format_money(trade.net_profit_loss),
    )
}

fn render_trade_table(trades: &[TradeRecord]) -> String {
    let mut rows = String::new();
    for trade in trades {
        rows.push_str(&render_trade_row(trade));
    }

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div class="row mb-4"><div class="col-12"><div class="card">
<div class="card-header d-flex justify-content-between align-items-center">
<h5><i class="fas fa-table"></i> Trade records</h5>
<div>
<form method="post" action="/export/detailed" class="d-inline"><button type="submit" class="btn btn-success"><i class="fas fa-file-excel"></i> Export detailed records</button></form>
<form method="post" action="/export/basic" class="d-inline"><button type="submit" class="btn btn-info"><i class="fas fa-file-excel"></i> Export basic records</button></form>
</div>
</div>
<div class="card-body"><div class="table-responsive"><table class="table table-striped table-hover">
<thead class="thead-dark"><tr><th>Entry date</th><th>Exit date</th><th>Stock</th><th>Direction</th><th>Entry price</th><th>Exit price</th><th>Shares</th><th>P&amp;L</th><th>P&amp;L rate</th><th>Net P&amp;L</th></tr></thead>
<tbody>{}</tbody>
</table></div></div>
</div></div></div>"#,
        rows
    );
    html
}

fn render_chart_placeholder(result: &BacktestResult) -> String {
    let equity = if result.has_equity_curve() {
        r#"<div class="chart-container"><h6>Equity curve</h6><div class="text-center text-muted"><i class="fas fa-chart-line fa-3x mb-3"></i><p>Charts are not available yet</p></div></div>"#
    } else {
        ""
    };
    format!(
        r#"<div class="row mb-4"><div class="col-12"><div class="card"><div class="card-header"><h5><i class="fas fa-chart-line"></i> Performance charts</h5></div><div class="card-body"><div id="charts-container">{}</div></div></div></div></div>"#,
        equity
    )
}

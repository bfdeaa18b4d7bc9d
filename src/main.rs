// ==========================================
// 仓储计件库存系统 - 命令行入口
// ==========================================
// 用法: wms-ledger [数据库路径]
// 打开（必要时新建）数据库并打印库存概况与配置快照
// ==========================================

use anyhow::{anyhow, Context, Result};

use wms_inventory_ledger::app::{get_default_db_path, AppState};
use wms_inventory_ledger::{logging, APP_NAME, VERSION};

fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let stats = state
        .inventory_api
        .stats()
        .context("读取库存概况失败")?;
    let rules = state.rule_api.list_rules().context("读取入库规则失败")?;
    let assembly_rules = state
        .assembly_api
        .list_rules()
        .context("读取装配规则失败")?;
    let records = state
        .production_api
        .list()
        .context("读取计件记录失败")?;
    let blanks = state.inventory_api.list_blanks().context("读取毛坯库存失败")?;
    let finished = state
        .inventory_api
        .list_finished()
        .context("读取成品库存失败")?;

    println!("数据库: {}", state.db_path);
    println!(
        "零件库存: {} 行, 合计 {} 件, 欠料毛坯 {} 行",
        stats.total_items, stats.total_quantity, stats.owed_blank_rows
    );
    println!("毛坯库存: {} 行", blanks.len());
    println!("成品库存: {} 行", finished.len());
    println!("计件记录: {} 条", records.len());
    println!(
        "入库规则: {} 条 (启用 {})",
        rules.len(),
        rules.iter().filter(|r| r.is_enabled).count()
    );
    println!("装配规则: {} 条", assembly_rules.len());

    let snapshot = state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow!("读取配置快照失败: {}", e))?;
    println!("配置: {}", snapshot);

    Ok(())
}

mod common;

use anyhow::Result;
use common::*;
use partita::application::LedgerError;
use partita::domain::Account;

#[tokio::test]
async fn test_analytic_balance_is_the_signed_sum_of_entries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let date = parse_date("2024-03-01");

    // Fund the treasury twice, then pay something out of it.
    post_movement(&service, "equity.opening.balance", "asset.main.treasury", 500, date).await?;
    post_movement(&service, "equity.opening.balance", "asset.main.treasury", 200, date).await?;
    post_movement(&service, "asset.main.treasury", "expense.office.rent", 150, date).await?;

    let treasury = Account::new_analytic("asset.main.treasury")?;
    let balance = service.analytic_balance(&treasury).await?;
    assert_eq!(balance.balance(), 500 + 200 - 150);
    assert_eq!(balance.version(), Some(3));

    Ok(())
}

#[tokio::test]
async fn test_unknown_account_is_not_a_zero_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = Account::new_analytic("asset.never.posted")?;
    let err = service.analytic_balance(&account).await.unwrap_err();

    assert!(matches!(err, LedgerError::AccountNotFound(value) if value == "asset.never.posted"));

    Ok(())
}

#[tokio::test]
async fn test_accessors_reject_the_wrong_account_type() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let synthetic = Account::new("asset.*.treasury")?;
    assert!(matches!(
        service.analytic_balance(&synthetic).await,
        Err(LedgerError::NotAnalytic(_))
    ));

    let analytic = Account::new_analytic("asset.account.treasury")?;
    assert!(matches!(
        service.synthetic_balance(&analytic).await,
        Err(LedgerError::NotSynthetic(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_synthetic_balance_aggregates_matching_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let date = parse_date("2024-03-01");

    post_movement(&service, "equity.opening.balance", "asset.main.treasury", 500, date).await?;
    post_movement(&service, "equity.opening.balance", "asset.reserve.treasury", 300, date).await?;
    post_movement(&service, "equity.opening.balance", "asset.main.savings", 900, date).await?;

    let pattern = Account::new("asset.*.treasury")?;
    let aggregate = service.synthetic_balance(&pattern).await?;

    // The aggregate equals the sum of the matching analytic balances.
    let mut expected = 0;
    for value in ["asset.main.treasury", "asset.reserve.treasury"] {
        let account = Account::new_analytic(value)?;
        expected += service.analytic_balance(&account).await?.balance();
    }
    assert_eq!(aggregate.balance(), expected);
    assert_eq!(aggregate.balance(), 800);
    assert_eq!(aggregate.version(), None);

    Ok(())
}

#[tokio::test]
async fn test_synthetic_pattern_matches_deeper_paths() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let date = parse_date("2024-03-01");

    post_movement(
        &service,
        "equity.opening.balance",
        "asset.main.treasury.operational",
        250,
        date,
    )
    .await?;

    let pattern = Account::new("asset.*.treasury")?;
    assert_eq!(service.synthetic_balance(&pattern).await?.balance(), 250);

    Ok(())
}

#[tokio::test]
async fn test_synthetic_balance_with_no_matches_is_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let pattern = Account::new("revenue.*.fees")?;
    let aggregate = service.synthetic_balance(&pattern).await?;

    assert_eq!(aggregate.balance(), 0);
    assert_eq!(aggregate.version(), None);

    Ok(())
}

#[tokio::test]
async fn test_debits_and_credits_cancel_across_the_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let date = parse_date("2024-03-01");

    post_movement(&service, "equity.opening.balance", "asset.main.treasury", 500, date).await?;
    post_movement(&service, "asset.main.treasury", "expense.office.rent", 120, date).await?;
    post_movement(&service, "asset.main.treasury", "liability.supplier.invoices", 80, date).await?;

    // A wildcard-first pattern spans every account, and double entry makes
    // the whole ledger sum to zero.
    let everything = Account::new("*")?;
    assert_eq!(service.synthetic_balance(&everything).await?.balance(), 0);

    Ok(())
}

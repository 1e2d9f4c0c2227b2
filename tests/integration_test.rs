//! Integration tests for the engine, metrics and file adapters.
//!
//! Tests cover:
//! - Round-trip trading on a short series and the derived P&L
//! - Position, idempotence and no-signal properties over random series
//! - Degenerate date spans and mismatched benchmark lengths
//! - Price, dataset and report adapters wired through a full run

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use tickback::adapters::csv_adapter::CsvPriceSource;
use tickback::adapters::csv_dataset_adapter::{CsvDataset, DEFAULT_DATE_FORMAT};
use tickback::adapters::csv_report_adapter::CsvReportAdapter;
use tickback::domain::backtest::{Backtest, BacktestConfig, CostModel};
use tickback::domain::metrics::{self, Metrics};
use tickback::domain::position::{Order, Position, Side};
use tickback::domain::strategy::{
    BollingerReversion, BuyAndHold, DatasetThreshold, SignalFn, Strategy,
};
use tickback::ports::data_port::PriceSource;
use tickback::ports::report_port::ReportPort;

mod round_trip {
    use super::*;

    #[test]
    fn buy_then_close_on_three_ticks() {
        let series = make_series("SPY", &[100.0, 110.0, 105.0]);
        let mut strategy = scripted(vec![(0, Order::Buy), (2, Order::Close)]);

        let result = Backtest::default().run(&series, &mut strategy).unwrap();

        let trades: Vec<(Side, usize)> = result.trades().iter().map(|t| (t.side, t.index)).collect();
        assert_eq!(trades, vec![(Side::Buy, 0), (Side::Sell, 2)]);
        assert_relative_eq!(result.gross_pnl_at(2), 5.0);
        assert_relative_eq!(result.net_pnl_at(2), 5.0);
        assert_relative_eq!(result.returns_at(2), 5.0);
        assert_eq!(result.position(), Position::Flat);
    }

    #[test]
    fn buy_immediately_followed_by_close() {
        let series = make_series("SPY", &[50.0, 55.0, 60.0]);
        let mut strategy = scripted(vec![(0, Order::Buy), (1, Order::Close)]);

        let result = Backtest::default().run(&series, &mut strategy).unwrap();

        assert_eq!(result.trades().len(), 2);
        assert_eq!(result.trades()[0].side, Side::Buy);
        assert_eq!(result.trades()[1].side, Side::Sell);
        assert_eq!(result.position(), Position::Flat);
        assert_relative_eq!(result.net_pnl(), 5.0);
    }

    #[test]
    fn costs_are_charged_per_trade() {
        let series = make_series("SPY", &[100.0, 110.0, 105.0]);
        let mut strategy = scripted(vec![(0, Order::Buy), (2, Order::Close)]);
        let engine = Backtest::new(BacktestConfig {
            cost: CostModel::fixed_plus_pct(1.0, 0.0),
        });

        let result = engine.run(&series, &mut strategy).unwrap();

        assert_relative_eq!(result.trade_cost(), 2.0);
        assert_relative_eq!(result.net_pnl(), 3.0);
        assert_relative_eq!(result.returns(), 3.0);
    }

    #[test]
    fn snapshot_history_tracks_every_tick() {
        let series = make_series("SPY", &[100.0, 101.0, 103.0, 102.0]);
        let result = Backtest::default().run(&series, &mut BuyAndHold).unwrap();

        assert_eq!(result.history().len(), 4);
        assert_eq!(result.history_values(), vec![0.0, 1.0, 3.0, 2.0]);
        assert_eq!(result.history()[3].date, date(2024, 1, 4));
    }
}

mod properties {
    use super::*;
    use proptest::strategy::Strategy as _;

    fn order() -> impl proptest::strategy::Strategy<Value = Option<Order>> {
        prop_oneof![
            Just(None),
            Just(Some(Order::Buy)),
            Just(Some(Order::Sell)),
            Just(Some(Order::Close)),
        ]
    }

    fn closes_and_orders() -> impl proptest::strategy::Strategy<Value = (Vec<f64>, Vec<Option<Order>>)>
    {
        (1usize..40).prop_flat_map(|n| {
            (
                prop::collection::vec(1.0f64..1000.0, n),
                prop::collection::vec(order(), n),
            )
        })
    }

    fn replay(orders: Vec<Option<Order>>) -> SignalFn<impl FnMut(&TickView<'_>) -> Option<Order>> {
        SignalFn::new("replay", move |t: &TickView<'_>| orders[t.index()])
    }

    proptest! {
        #[test]
        fn no_signal_means_no_trades(closes in prop::collection::vec(1.0f64..1000.0, 1..60)) {
            let series = make_series("P", &closes);
            let mut strategy = SignalFn::new("none", |_: &TickView<'_>| None);
            let result = Backtest::default().run(&series, &mut strategy).unwrap();

            prop_assert!(result.trades().is_empty());
            prop_assert_eq!(result.net_pnl(), 0.0);
            prop_assert_eq!(result.position(), Position::Flat);
        }

        #[test]
        fn position_ignores_future_trades((closes, orders) in closes_and_orders()) {
            let series = make_series("P", &closes);
            let full = Backtest::default()
                .run(&series, &mut replay(orders.clone()))
                .unwrap();

            for as_of in 0..closes.len() {
                let position = full.position_at(as_of);
                prop_assert!(matches!(position, Position::Long | Position::Flat | Position::Short));

                let prefix = make_series("P", &closes[..=as_of]);
                let partial = Backtest::default()
                    .run(&prefix, &mut replay(orders[..=as_of].to_vec()))
                    .unwrap();
                prop_assert_eq!(partial.position(), position);
            }
        }

        #[test]
        fn repeated_orders_are_idempotent(closes in prop::collection::vec(1.0f64..1000.0, 1..60)) {
            let series = make_series("P", &closes);

            let mut always_buy = SignalFn::new("buy", |_: &TickView<'_>| Some(Order::Buy));
            let result = Backtest::default().run(&series, &mut always_buy).unwrap();
            prop_assert_eq!(result.trades().len(), 1);
            prop_assert_eq!(result.position(), Position::Long);

            let mut always_close = SignalFn::new("close", |_: &TickView<'_>| Some(Order::Close));
            let result = Backtest::default().run(&series, &mut always_close).unwrap();
            prop_assert!(result.trades().is_empty());
        }

        #[test]
        fn non_decreasing_history_wins_every_day(steps in prop::collection::vec(0.0f64..10.0, 1..60)) {
            let mut values = vec![1.0];
            for step in steps {
                let last = values[values.len() - 1];
                values.push(last + step);
            }
            prop_assert_eq!(metrics::winrate(&values, 1), 100.0);
        }
    }
}

mod degenerate_inputs {
    use super::*;

    #[test]
    fn zero_day_span_counts_as_one_year() {
        let day = date(2024, 3, 1);
        let series = Series::new(
            "SPY",
            vec![make_tick(0, day, 100.0), make_tick(1, day, 110.0)],
        )
        .unwrap();

        let result = Backtest::default().run(&series, &mut BuyAndHold).unwrap();

        let aar = result.average_annual_return();
        assert!(aar.is_finite());
        assert_relative_eq!(aar, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn single_tick_run_is_well_defined() {
        let series = make_series("SPY", &[100.0]);
        let result = Backtest::default().run(&series, &mut BuyAndHold).unwrap();

        assert_eq!(result.net_pnl(), 0.0);
        assert_eq!(result.average_annual_return(), 0.0);
        assert_eq!(result.volatility(), 0.0);
        assert_eq!(result.daily(), 0.0);
    }

    #[test]
    fn longer_benchmark_is_truncated() {
        let series = make_series("SPY", &[100.0, 102.0, 101.0, 105.0, 107.0]);
        let benchmark = make_series("IDX", &[50.0, 51.0, 50.0, 52.0, 53.0, 60.0, 40.0]);
        let result = Backtest::default().run(&series, &mut BuyAndHold).unwrap();

        let beta = result.beta(&benchmark);
        assert!(beta.is_finite());

        let portfolio_changes = metrics::pct_changes(&result.history_values());
        let benchmark_changes = metrics::pct_changes(&benchmark.closes());
        assert!(benchmark_changes.len() > portfolio_changes.len());
        assert_eq!(
            beta,
            metrics::beta(&portfolio_changes, &benchmark_changes[..portfolio_changes.len()])
        );
    }

    #[test]
    fn metrics_summary_includes_beta_only_with_benchmark() {
        let series = make_series("SPY", &[100.0, 102.0, 101.0, 105.0]);
        let result = Backtest::default().run(&series, &mut BuyAndHold).unwrap();

        assert_eq!(Metrics::compute(&result, None).beta, None);
        assert!(Metrics::compute(&result, Some(&series)).beta.is_some());
    }
}

mod adapters {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn csv_prices_through_bollinger_to_report() {
        let dir = TempDir::new().unwrap();
        let closes = [
            10.0, 10.0, 10.0, 10.0, 10.0, 14.0, 10.0, 10.0, 10.0, 6.0, 10.0, 10.0,
        ];
        write_price_csv(dir.path(), "ABC", &closes);

        let source = CsvPriceSource::new(dir.path().to_path_buf());
        assert_eq!(source.list_symbols().unwrap(), vec!["ABC"]);
        let series = source.fetch_series("ABC").unwrap();

        let mut strategy = BollingerReversion { period: 5, k: 1.0 };
        let result = Backtest::default().run(&series, &mut strategy).unwrap();
        assert!(!result.trades().is_empty());
        assert_eq!(result.strategy_name(), "Bollinger");

        let report = dir.path().join("out.csv");
        CsvReportAdapter.write(&result, &report).unwrap();
        let content = std::fs::read_to_string(&report).unwrap();
        assert_eq!(content.lines().count(), closes.len() + 1);
        assert!(content.starts_with("date,close,position,net_pnl,returns,trade"));
    }

    #[test]
    fn dataset_driven_strategy_over_csv_files() {
        let dir = TempDir::new().unwrap();
        write_price_csv(dir.path(), "SPY", &[100.0, 101.0, 102.0, 103.0]);

        // Rows dated a year before the ticks so the 365-day embargo lines up.
        let dataset = CsvDataset::from_string(
            "Date,Utility Patents Issued\n\
             2022-12-01,100\n\
             2022-12-31,120\n\
             2023-01-02,60\n",
            DEFAULT_DATE_FORMAT,
        )
        .unwrap();

        let series = CsvPriceSource::new(dir.path().to_path_buf())
            .fetch_series("SPY")
            .unwrap();
        let mut strategy = DatasetThreshold {
            high: 2.0,
            low: -2.0,
            field: "Utility_Patents_Issued".into(),
            embargo_days: 365,
            dataset: Box::new(dataset),
        };
        assert_eq!(strategy.name(), "Patent");

        let result = Backtest::default().run(&series, &mut strategy).unwrap();

        // 2024-01-01 and 2024-01-02 see +20% (buy once), 2024-01-03 and
        // 2024-01-04 see -50% (sell flattens, then the second sell opens a short).
        let sides: Vec<(Side, usize)> = result.trades().iter().map(|t| (t.side, t.index)).collect();
        assert_eq!(sides, vec![(Side::Buy, 0), (Side::Sell, 2), (Side::Sell, 3)]);
        assert_eq!(result.position_at(1), Position::Long);
        assert_eq!(result.position_at(2), Position::Flat);
        assert_eq!(result.position(), Position::Short);
    }
}

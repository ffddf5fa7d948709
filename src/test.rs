#[cfg(test)]
pub mod test {
    use anyhow::Result;
    use std::fs;
    use std::io::Cursor;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use crate::archive::{BoardArchive, DRAWS_DIR, P1_WINS_DIR, P2_WINS_DIR};
    use crate::enumerate::enumerate_parallel_bounded;
    use crate::outcome_log::{read_log, OutcomeLog};
    use crate::*;

    fn config(width: usize, height: usize, win_amount: usize) -> GameConfig {
        GameConfig::new(width, height, win_amount).unwrap()
    }

    fn actions(line: &str) -> Vec<Action> {
        Action::parse_line(line).unwrap()
    }

    fn all_outcomes(config: GameConfig) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        enumerate(config, &mut outcomes, false)?;
        Ok(outcomes)
    }

    /// Accepts outcomes until the `fail_at`-th report, which fails
    struct FailingSink {
        reports: usize,
        fail_at: usize,
    }

    impl OutcomeSink for FailingSink {
        fn report_win(&mut self, _: Player, _: Board) -> crate::Result<()> {
            self.count_report()
        }

        fn report_draw(&mut self, _: Board) -> crate::Result<()> {
            self.count_report()
        }
    }

    impl FailingSink {
        fn count_report(&mut self) -> crate::Result<()> {
            self.reports += 1;
            if self.reports == self.fail_at {
                Err(Error::InvalidFlip)
            } else {
                Ok(())
            }
        }
    }

    /// Passes every outcome twice through its own uniqueness check
    struct Echo(UniqueOutcomes<Vec<Outcome>>);

    impl OutcomeSink for Echo {
        fn report_win(&mut self, winner: Player, board: Board) -> crate::Result<()> {
            self.0.report_win(winner, board.clone())?;
            self.0.report_win(winner, board)
        }

        fn report_draw(&mut self, board: Board) -> crate::Result<()> {
            self.0.report_draw(board.clone())?;
            self.0.report_draw(board)
        }
    }

    fn sorted_summary(outcomes: &[Outcome]) -> Vec<(String, String)> {
        let mut lines = summary(outcomes);
        lines.sort();
        lines
    }

    fn summary(outcomes: &[Outcome]) -> Vec<(String, String)> {
        outcomes
            .iter()
            .map(|o| (o.board.action_line(), o.classification.to_string()))
            .collect()
    }

    #[test]
    pub fn config_rejects_zero_parameters() {
        assert!(matches!(
            GameConfig::new(0, 3, 3),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            GameConfig::new(3, 0, 3),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            GameConfig::new(3, 3, 0),
            Err(Error::InvalidDimensions { .. })
        ));
        // no cross validation between the win amount and the dimensions
        assert!(GameConfig::new(2, 2, 5).is_ok());
    }

    #[test]
    pub fn placements_append_actions_in_order() -> Result<()> {
        let mut board = Board::with_dimensions(4, 4, 4)?;
        let columns = [2, 0, 3, 3, 1];
        let mut player = Player::One;

        for (i, &column) in columns.iter().enumerate() {
            assert!(!board.place(player, column)?);
            assert_eq!(board.actions().len(), i + 1);
            assert_eq!(board.actions()[i], Action::Place(column));
            player = player.other();
        }
        assert_eq!(board.action_line(), "2 0 3 3 1");
        Ok(())
    }

    #[test]
    pub fn invalid_placements() -> Result<()> {
        let mut board = Board::with_dimensions(3, 2, 3)?;

        // the upper bound is exclusive
        assert!(matches!(
            board.place(Player::One, 3),
            Err(Error::InvalidMove { column: 3, .. })
        ));
        assert!(!board.can_place(3));

        board.place(Player::One, 1)?;
        board.place(Player::Two, 1)?;
        assert!(matches!(
            board.place(Player::One, 1),
            Err(Error::InvalidMove { column: 1, .. })
        ));
        assert_eq!(board.actions().len(), 2);
        Ok(())
    }

    #[test]
    pub fn columns_fill_after_height_placements() -> Result<()> {
        let mut board = Board::with_dimensions(2, 3, 4)?;
        let mut player = Player::One;
        for placed in 0..3 {
            assert!(board.can_place(0));
            assert_eq!(board.column_height(0), placed);
            board.place(player, 0)?;
            player = player.other();
        }
        assert!(!board.can_place(0));
        assert!(board.can_place(1));

        // out of range columns hold nothing, like they accept nothing
        assert_eq!(board.column_height(2), 0);
        assert!(!board.can_place(2));
        Ok(())
    }

    #[test]
    pub fn flip_requires_a_placement() -> Result<()> {
        let mut board = Board::with_dimensions(3, 3, 3)?;
        assert!(!board.can_flip());
        assert!(matches!(board.flip(), Err(Error::InvalidFlip)));
        assert!(board.actions().is_empty());

        board.place(Player::One, 0)?;
        assert!(board.can_flip());
        assert_eq!(board.flip()?, None);
        assert!(!board.can_flip());

        // no consecutive flips, whatever the board holds
        assert!(matches!(board.flip(), Err(Error::InvalidFlip)));
        assert!(!board.can_flip());

        board.place(Player::One, 1)?;
        assert!(board.can_flip());
        assert_eq!(board.action_line(), "0 -1 1");
        Ok(())
    }

    #[test]
    pub fn vertical_win() -> Result<()> {
        let mut board = Board::with_dimensions(3, 3, 3)?;
        assert!(!board.place(Player::One, 0)?);
        assert!(!board.place(Player::Two, 1)?);
        assert!(!board.place(Player::One, 0)?);
        assert!(!board.place(Player::Two, 1)?);
        assert!(board.place(Player::One, 0)?);

        assert_eq!(board.actions(), &actions("0 1 0 1 0")[..]);
        assert_eq!(
            board.to_string(),
            "0 1 0 1 0\nOne Empty Empty\nOne Two Empty\nOne Two Empty\n"
        );
        Ok(())
    }

    #[test]
    pub fn vertical_win_is_reported_by_the_search() -> Result<()> {
        let (board, winner) = Board::replay(config(3, 3, 3), &actions("0 1 0 1"))?;
        assert_eq!(winner, None);

        let mut driver = SearchDriver::new(Vec::new());
        driver.search(&board, Player::One)?;
        let outcomes = driver.into_sink();

        // column 0 is tried first
        assert_eq!(outcomes[0].classification, Classification::Win(Player::One));
        assert_eq!(outcomes[0].board.actions(), &actions("0 1 0 1 0")[..]);
        Ok(())
    }

    #[test]
    pub fn horizontal_and_diagonal_wins() -> Result<()> {
        let (_, winner) = Board::replay(config(4, 4, 3), &actions("0 0 1 1 2"))?;
        assert_eq!(winner, Some(Player::One));

        // ___O
        // __OO
        // TOOT
        // OTTT
        let (_, winner) = Board::replay(config(4, 4, 4), &actions("0 1 1 2 2 3 2 3 3 0 3"))?;
        assert_eq!(winner, Some(Player::One));

        // the placed piece can sit in the middle of the run
        let (_, winner) = Board::replay(config(5, 2, 3), &actions("0 0 2 2 1"))?;
        assert_eq!(winner, Some(Player::One));
        Ok(())
    }

    #[test]
    pub fn full_board_draws_after_the_closing_flip() -> Result<()> {
        // O T O
        // T T O
        // O O T
        let nine = actions("0 2 1 0 2 1 0 1 2");
        let (board, winner) = Board::replay(config(3, 3, 3), &nine)?;
        assert_eq!(winner, None);
        assert!((0..3).all(|column| !board.can_place(column)));
        // the last placement allows a flip, so the game is not over yet
        assert!(board.can_flip());
        assert!(!board.is_exhausted());

        let mut driver = SearchDriver::new(Vec::new());
        driver.search(&board, Player::Two)?;
        let outcomes = driver.into_sink();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].classification, Classification::Draw);
        assert_eq!(outcomes[0].board.action_line(), "0 2 1 0 2 1 0 1 2 -1");
        assert!(outcomes[0].board.is_exhausted());
        Ok(())
    }

    #[test]
    pub fn flip_reverses_each_column() -> Result<()> {
        let (mut board, _) = Board::replay(config(2, 3, 3), &actions("0 0 0 1 1"))?;
        let before: Vec<Vec<Cell>> = (0..2)
            .map(|c| (0..board.column_height(c)).map(|r| board.cell(c, r)).collect())
            .collect();
        assert_eq!(
            before,
            vec![
                vec![Cell::PlayerOne, Cell::PlayerTwo, Cell::PlayerOne],
                vec![Cell::PlayerTwo, Cell::PlayerOne],
            ]
        );

        assert_eq!(board.flip()?, None);

        for column in 0..2 {
            let height = before[column].len();
            assert_eq!(board.column_height(column), height);
            for row in 0..height {
                assert_eq!(board.cell(column, row), before[column][height - 1 - row]);
            }
            for row in height..3 {
                assert!(board.cell(column, row).is_empty());
            }
        }
        assert_eq!(board.cell(1, 0), Cell::PlayerOne);
        assert_eq!(board.cell(1, 1), Cell::PlayerTwo);
        Ok(())
    }

    #[test]
    pub fn flip_can_hand_the_win_to_the_opponent() -> Result<()> {
        // _O__      _T__
        // OTOT  ->  OOOT
        let (mut board, winner) = Board::replay(config(4, 2, 3), &actions("0 1 1 3 2"))?;
        assert_eq!(winner, None);
        assert_eq!(board.flip()?, Some(Player::One));
        Ok(())
    }

    #[test]
    pub fn flip_tie_at_the_win_amount_has_no_winner() -> Result<()> {
        // _O___T_       _T___O_
        // OTO_TOT  ->   OOO_TTT
        let (mut board, winner) = Board::replay(config(7, 2, 3), &actions("0 1 1 4 5 5 2 6"))?;
        assert_eq!(winner, None);

        assert_eq!(board.flip()?, None);
        assert_eq!(board.cell(1, 0), Cell::PlayerOne);
        assert_eq!(board.cell(5, 0), Cell::PlayerTwo);

        // the game goes on after a tied flip
        let (board, winner) = Board::replay(config(7, 2, 3), &actions("0 1 1 4 5 5 2 6 -1"))?;
        assert_eq!(winner, None);
        assert!(!board.is_exhausted());
        Ok(())
    }

    #[test]
    pub fn flip_tie_above_the_win_amount_has_no_winner() -> Result<()> {
        // wins are ignored here, only the flip policy is under test
        let mut board = Board::with_dimensions(2, 3, 2)?;
        for _ in 0..3 {
            board.place(Player::One, 0)?;
            board.place(Player::Two, 1)?;
        }
        assert_eq!(board.flip()?, None);

        let mut board = Board::with_dimensions(2, 3, 2)?;
        for _ in 0..3 {
            board.place(Player::One, 0)?;
        }
        board.place(Player::Two, 1)?;
        board.place(Player::Two, 1)?;
        // both pass the win amount, the longer run wins
        assert_eq!(board.flip()?, Some(Player::One));
        Ok(())
    }

    #[test]
    pub fn replay_is_deterministic() -> Result<()> {
        let history = actions("0 2 1 -1 1 0 2 -1 2");
        let first = Board::replay(config(3, 3, 3), &history)?;
        let second = Board::replay(config(3, 3, 3), &history)?;
        assert_eq!(first, second);

        for outcome in all_outcomes(config(3, 2, 3))? {
            let (board, winner) = Board::replay(outcome.board.config(), outcome.board.actions())?;
            assert_eq!(board, outcome.board);
            match outcome.classification {
                Classification::Win(player) => assert_eq!(winner, Some(player)),
                Classification::Draw => {
                    assert_eq!(winner, None);
                    assert!(board.is_exhausted());
                }
            }
        }
        Ok(())
    }

    #[test]
    pub fn replay_rejects_moves_after_a_win() {
        let result = Board::replay(config(3, 3, 3), &actions("0 1 0 1 0 2"));
        assert!(matches!(result, Err(Error::GameOver { ply: 5 })));
    }

    #[test]
    pub fn parse_actions() {
        assert_eq!(
            actions(" 0 1  -1 12 "),
            vec![
                Action::Place(0),
                Action::Place(1),
                Action::Flip,
                Action::Place(12)
            ]
        );
        assert!(matches!(
            Action::parse_line("0 -2"),
            Err(Error::ParseAction { .. })
        ));
        assert!(matches!(
            Action::parse_line("0 x"),
            Err(Error::ParseAction { .. })
        ));
    }

    #[test]
    pub fn single_cell_board() -> Result<()> {
        let outcomes = all_outcomes(config(1, 1, 1))?;
        assert_eq!(
            summary(&outcomes),
            vec![("0".to_string(), "One won".to_string())]
        );
        Ok(())
    }

    #[test]
    pub fn single_column_enumeration() -> Result<()> {
        let outcomes = all_outcomes(config(1, 2, 2))?;
        assert_eq!(
            summary(&outcomes),
            vec![
                ("0 0 -1".to_string(), "Draw".to_string()),
                ("0 -1 0".to_string(), "One won".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    pub fn single_row_enumeration() -> Result<()> {
        let mut tally = Tally::new();
        let mut outcomes = Vec::new();
        let mut sink = (&mut tally, &mut outcomes);
        let report = enumerate(config(2, 1, 2), &mut sink, false)?;

        assert_eq!(
            summary(&outcomes),
            vec![
                ("0 1 -1".to_string(), "Draw".to_string()),
                ("0 -1 1".to_string(), "One won".to_string()),
                ("1 0 -1".to_string(), "Draw".to_string()),
                ("1 -1 0".to_string(), "One won".to_string()),
            ]
        );
        assert_eq!(report.outcomes, 4);
        assert_eq!(tally.player_one_wins, 2);
        assert_eq!(tally.player_two_wins, 0);
        assert_eq!(tally.draws, 2);
        assert_eq!(tally.shortest, Some(3));
        assert_eq!(tally.longest, Some(3));
        Ok(())
    }

    #[test]
    pub fn enumeration_leaves_are_well_formed() -> Result<()> {
        let config = config(3, 2, 3);
        let outcomes = all_outcomes(config)?;
        assert!(!outcomes.is_empty());

        for outcome in outcomes.iter() {
            let history = outcome.board.actions();
            assert!(history.len() <= config.max_depth());
            assert_ne!(history[0], Action::Flip);
            assert!(history
                .windows(2)
                .all(|pair| !(pair[0] == Action::Flip && pair[1] == Action::Flip)));
        }
        Ok(())
    }

    #[test]
    pub fn impossible_wins_end_in_draws() -> Result<()> {
        let mut tally = Tally::new();
        enumerate(config(2, 2, 3), &mut tally, false)?;
        assert!(tally.total() > 0);
        assert_eq!(tally.draws, tally.total());
        Ok(())
    }

    #[test]
    pub fn parallel_matches_sequential() -> Result<()> {
        let config = config(3, 2, 3);
        let sequential = all_outcomes(config)?;

        let mut parallel = Vec::new();
        let report = enumerate_parallel(config, &mut parallel, false)?;
        assert_eq!(report.outcomes, sequential.len());

        let mut expected = summary(&sequential);
        let mut actual = summary(&parallel);
        expected.sort();
        actual.sort();
        assert_eq!(expected, actual);
        Ok(())
    }

    #[test]
    pub fn parallel_with_a_tiny_channel_matches_sequential() -> Result<()> {
        let config = config(3, 3, 3);
        let expected = sorted_summary(&all_outcomes(config)?);

        // workers block on every send until the collector takes the outcome
        for &bound in [0, 1, 16].iter() {
            let mut parallel = Vec::new();
            let report = enumerate_parallel_bounded(config, &mut parallel, false, bound)?;
            assert_eq!(report.outcomes, expected.len());
            assert_eq!(sorted_summary(&parallel), expected);
        }
        Ok(())
    }

    #[test]
    pub fn parallel_with_a_visible_progress_bar() -> Result<()> {
        let mut tally = Tally::new();
        let report = enumerate_parallel(config(3, 2, 3), &mut tally, true)?;
        assert_eq!(report.outcomes, tally.total());

        let mut sequential = Tally::new();
        enumerate(config(3, 2, 3), &mut sequential, true)?;
        assert_eq!(tally.total(), sequential.total());
        Ok(())
    }

    #[test]
    pub fn parallel_sink_failure_is_returned() -> Result<()> {
        for &fail_at in [1, 10, 500].iter() {
            let mut sink = FailingSink {
                reports: 0,
                fail_at,
            };
            let result = enumerate_parallel(config(3, 3, 3), &mut sink, false);

            // the failure wins over the cancellations it triggers in the workers
            assert!(matches!(result, Err(Error::InvalidFlip)));
            assert_eq!(sink.reports, fail_at);
        }
        Ok(())
    }

    #[test]
    pub fn parallel_structural_violation_is_returned() -> Result<()> {
        let mut sink = Echo(UniqueOutcomes::new(Vec::new()));
        let result = enumerate_parallel(config(3, 3, 3), &mut sink, false);

        assert!(matches!(result, Err(Error::StructuralViolation { .. })));
        assert_eq!(sink.0.len(), 1);
        Ok(())
    }

    #[test]
    pub fn sequential_sink_failure_is_returned() -> Result<()> {
        let mut sink = FailingSink {
            reports: 0,
            fail_at: 10,
        };
        let result = enumerate(config(3, 3, 3), &mut sink, false);
        assert!(matches!(result, Err(Error::InvalidFlip)));
        assert_eq!(sink.reports, 10);
        Ok(())
    }

    #[test]
    pub fn repeated_history_is_a_structural_violation() -> Result<()> {
        let (board, _) = Board::replay(config(3, 3, 3), &actions("0 1 0 1 0"))?;
        let mut unique = UniqueOutcomes::new(Vec::new());

        unique.report_win(Player::One, board.clone())?;
        let result = unique.report_draw(board);
        assert!(matches!(
            result,
            Err(Error::StructuralViolation { ref actions }) if actions == "0 1 0 1 0"
        ));
        assert_eq!(unique.len(), 1);
        assert_eq!(unique.into_inner().len(), 1);
        Ok(())
    }

    #[test]
    pub fn cancelled_search_stops() -> Result<()> {
        let flag = Arc::new(AtomicBool::new(true));
        let mut driver = SearchDriver::new(Tally::new()).with_cancel_flag(flag);
        let result = driver.search(&Board::new(GameConfig::default()), Player::One);

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(driver.sink().total(), 0);
        Ok(())
    }

    #[test]
    pub fn outcome_log_replays() -> Result<()> {
        let config = config(3, 2, 3);
        let mut log = OutcomeLog::new(Vec::new(), &config)?;
        let mut outcomes = Vec::new();
        {
            let mut sink = (&mut outcomes, &mut log);
            enumerate(config, &mut sink, false)?;
        }
        assert_eq!(log.records(), outcomes.len());
        let bytes = log.finish()?;

        let (read_config, logged) = read_log(Cursor::new(bytes))?;
        assert_eq!(read_config, config);
        assert_eq!(logged.len(), outcomes.len());
        for (entry, outcome) in logged.iter().zip(outcomes.iter()) {
            assert_eq!(entry.replay(read_config)?, *outcome);
        }
        Ok(())
    }

    #[test]
    pub fn corrupt_outcome_log() -> Result<()> {
        let mut log = OutcomeLog::new(Vec::new(), &config(2, 1, 2))?;
        let (board, _) = Board::replay(config(2, 1, 2), &actions("0 1 -1"))?;
        // logged as a win although the game is drawn
        log.report_win(Player::Two, board)?;
        let mut bytes = log.finish()?;

        let (config, logged) = read_log(Cursor::new(bytes.clone()))?;
        assert!(matches!(
            logged[0].replay(config),
            Err(Error::CorruptLog { .. })
        ));

        // unknown classification byte right after the header
        bytes[6] = 7;
        assert!(matches!(
            read_log(Cursor::new(bytes)),
            Err(Error::CorruptLog { .. })
        ));
        Ok(())
    }

    #[test]
    pub fn archive_writes_one_file_per_outcome() -> Result<()> {
        let root = std::env::temp_dir().join(format!("flip_connect4_archive_{}", std::process::id()));
        let mut archive = BoardArchive::create(&root)?;
        let mut outcomes = Vec::new();
        {
            let mut sink = (&mut outcomes, &mut archive);
            enumerate(config(2, 1, 2), &mut sink, false)?;
        }
        assert_eq!(archive.written(), 4);

        let count = |dir: &str| -> Result<usize> { Ok(fs::read_dir(root.join(dir))?.count()) };
        assert_eq!(count(P1_WINS_DIR)?, 2);
        assert_eq!(count(P2_WINS_DIR)?, 0);
        assert_eq!(count(DRAWS_DIR)?, 2);

        let draw = fs::read_to_string(root.join(DRAWS_DIR).join("2_1_3_0.txt"))?;
        assert_eq!(draw, outcomes[0].board.to_string());
        assert_eq!(draw, "0 1 -1\nOne Two\n");

        // a second archive starts from empty directories
        BoardArchive::create(&root)?;
        assert_eq!(count(P1_WINS_DIR)?, 0);

        fs::remove_dir_all(&root)?;
        Ok(())
    }
}

//! Read operations over the stat store

use super::{models::*, schema::Database};
use crate::cli::types::{PlayerId, Position, Season, TeamId, Week};
use crate::error::Result;
use rusqlite::params;
use std::collections::HashMap;

impl Database {
    /// Look up a single player row.
    pub fn get_player(&self, player_id: &PlayerId) -> Result<Option<PlayerRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id, player_name, position FROM players WHERE player_id = ?")?;
        let result = stmt.query_row(params![player_id.as_str()], |row| {
            Ok(PlayerRow {
                player_id: PlayerId::new(row.get::<_, String>(0)?),
                player_name: row.get(1)?,
                position: parse_position_cell(&row.get::<_, String>(2)?),
            })
        });
        match result {
            Ok(player) => Ok(Some(player)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Box-score history for one player, strictly before `(season, week)`,
    /// most recent first.
    pub fn player_history(
        &self,
        player_id: &PlayerId,
        season: Season,
        week: Week,
        limit: usize,
    ) -> Result<Vec<GameStatRow>> {
        let sql = format!(
            "SELECT {} FROM game_stats gs
             JOIN games g ON gs.game_id = g.game_id
             WHERE gs.player_id = ?
               AND (g.season_id < ? OR (g.season_id = ? AND g.week < ?))
             ORDER BY g.season_id DESC, g.week DESC
             LIMIT ?",
            GameStatRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                player_id.as_str(),
                season.as_u16(),
                season.as_u16(),
                week.as_u16(),
                limit as i64
            ],
            GameStatRow::from_row,
        )?;
        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    /// Bulk history load for many players in one pass, strictly before
    /// `(season, week)`, grouped per player and ordered most recent first.
    pub fn player_history_bulk(
        &self,
        player_ids: &[PlayerId],
        season: Season,
        week: Week,
    ) -> Result<HashMap<PlayerId, Vec<GameStatRow>>> {
        let mut grouped: HashMap<PlayerId, Vec<GameStatRow>> = HashMap::new();
        if player_ids.is_empty() {
            return Ok(grouped);
        }

        // SQLite caps bound parameters; chunk the id list well below it.
        for chunk in player_ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM game_stats gs
                 JOIN games g ON gs.game_id = g.game_id
                 WHERE gs.player_id IN ({placeholders})
                   AND (g.season_id < ? OR (g.season_id = ? AND g.week < ?))
                 ORDER BY gs.player_id, g.season_id DESC, g.week DESC",
                GameStatRow::COLUMNS
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut bound: Vec<Box<dyn rusqlite::ToSql>> = chunk
                .iter()
                .map(|id| Box::new(id.as_str().to_string()) as Box<dyn rusqlite::ToSql>)
                .collect();
            bound.push(Box::new(season.as_u16()));
            bound.push(Box::new(season.as_u16()));
            bound.push(Box::new(week.as_u16()));

            let rows = stmt.query_map(
                rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
                GameStatRow::from_row,
            )?;
            for row in rows {
                let row = row?;
                grouped.entry(row.player_id.clone()).or_default().push(row);
            }
        }
        Ok(grouped)
    }

    /// Defensive history for one team, strictly before `(season, week)`,
    /// most recent first.
    pub fn defense_history(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        limit: usize,
    ) -> Result<Vec<TeamDefenseRow>> {
        let sql = format!(
            "SELECT {} FROM team_defense_stats tds
             WHERE tds.team_id = ?
               AND (tds.season_id < ? OR (tds.season_id = ? AND tds.week < ?))
             ORDER BY tds.season_id DESC, tds.week DESC
             LIMIT ?",
            TeamDefenseRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                team_id.as_str(),
                season.as_u16(),
                season.as_u16(),
                week.as_u16(),
                limit as i64
            ],
            TeamDefenseRow::from_row,
        )?;
        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    /// Same-season defensive rows for a team inside a lookback window
    /// `[week - lookback, week)`, most recent first.
    pub fn defense_window(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        lookback: u16,
    ) -> Result<Vec<TeamDefenseRow>> {
        let floor = week.as_u16().saturating_sub(lookback);
        let sql = format!(
            "SELECT {} FROM team_defense_stats tds
             WHERE tds.team_id = ? AND tds.season_id = ?
               AND tds.week < ? AND tds.week >= ?
             ORDER BY tds.week DESC",
            TeamDefenseRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![team_id.as_str(), season.as_u16(), week.as_u16(), floor],
            TeamDefenseRow::from_row,
        )?;
        let mut window = Vec::new();
        for row in rows {
            window.push(row?);
        }
        Ok(window)
    }

    /// Skill players whose team has a game in `(season, week)` and who have
    /// played recently enough to be projectable. A player traded mid-season
    /// resolves to the team they most recently suited up for.
    pub fn eligible_players(&self, season: Season, week: Week) -> Result<Vec<EligiblePlayer>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.player_id, p.player_name, p.position, gs.team_id,
                    MAX(g.week) AS last_week
             FROM players p
             JOIN game_stats gs ON gs.player_id = p.player_id
             JOIN games g ON g.game_id = gs.game_id
             WHERE p.position IN ('QB', 'RB', 'WR', 'TE')
               AND g.season_id = ?
               AND g.week < ?
               AND gs.team_id IS NOT NULL
             GROUP BY p.player_id, p.player_name, p.position, gs.team_id
             HAVING last_week >= ?",
        )?;
        let floor = week.as_u16().saturating_sub(4);
        let rows = stmt.query_map(params![season.as_u16(), week.as_u16(), floor], |row| {
            Ok(EligiblePlayer {
                player_id: PlayerId::new(row.get::<_, String>(0)?),
                player_name: row.get(1)?,
                position: parse_position_cell(&row.get::<_, String>(2)?),
                team_id: TeamId::new(row.get::<_, String>(3)?),
                last_week_played: Week::new(row.get::<_, u16>(4)?),
            })
        })?;

        // Keep one entry per player: the most recent team stint.
        let mut best: HashMap<PlayerId, EligiblePlayer> = HashMap::new();
        for row in rows {
            let row = row?;
            match best.get(&row.player_id) {
                Some(existing) if existing.last_week_played >= row.last_week_played => {}
                _ => {
                    best.insert(row.player_id.clone(), row);
                }
            }
        }

        // Only players whose team actually plays this week.
        let playing: Vec<TeamId> = self
            .week_matchups(season, week)?
            .into_iter()
            .map(|m| m.team_id)
            .collect();
        let mut eligible: Vec<EligiblePlayer> = best
            .into_values()
            .filter(|p| playing.contains(&p.team_id))
            .collect();
        eligible.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        Ok(eligible)
    }

    /// Both sides of every game scheduled in `(season, week)`.
    pub fn week_matchups(&self, season: Season, week: Week) -> Result<Vec<WeekMatchup>> {
        let mut stmt = self.conn.prepare(
            "SELECT home_team_id, away_team_id FROM games
             WHERE season_id = ? AND week = ?
             ORDER BY game_id",
        )?;
        let rows = stmt.query_map(params![season.as_u16(), week.as_u16()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut matchups = Vec::new();
        for row in rows {
            let (home, away) = row?;
            matchups.push(WeekMatchup {
                team_id: TeamId::new(home.clone()),
                opponent_id: TeamId::new(away.clone()),
                is_home: true,
            });
            matchups.push(WeekMatchup {
                team_id: TeamId::new(away),
                opponent_id: TeamId::new(home),
                is_home: false,
            });
        }
        Ok(matchups)
    }

    /// The opponent for `team_id` in `(season, week)`, if scheduled.
    pub fn opponent_for(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Option<TeamId>> {
        let mut stmt = self.conn.prepare(
            "SELECT CASE
                        WHEN home_team_id = ?1 THEN away_team_id
                        ELSE home_team_id
                    END
             FROM games
             WHERE (home_team_id = ?1 OR away_team_id = ?1)
               AND season_id = ?2 AND week = ?3",
        )?;
        let result = stmt.query_row(
            params![team_id.as_str(), season.as_u16(), week.as_u16()],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(opponent) => Ok(Some(TeamId::new(opponent))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Per-game offensive aggregates for a team over the same-season window
    /// `[week - lookback, week)`, most recent first.
    pub fn offense_game_aggregates(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        lookback: u16,
    ) -> Result<Vec<OffenseGameAgg>> {
        let floor = week.as_u16().saturating_sub(lookback);
        let mut stmt = self.conn.prepare(
            "SELECT g.week,
                    CASE WHEN g.home_team_id = ?1 THEN g.home_score ELSE g.away_score END,
                    SUM(COALESCE(gs.pass_yards, 0)),
                    SUM(COALESCE(gs.rush_yards, 0)),
                    SUM(COALESCE(gs.pass_touchdowns, 0)),
                    SUM(COALESCE(gs.rush_touchdowns, 0)),
                    SUM(COALESCE(gs.receiving_touchdowns, 0)),
                    SUM(COALESCE(gs.pass_interceptions, 0) + COALESCE(gs.rush_fumbles, 0)
                        + COALESCE(gs.receiving_fumbles, 0)),
                    SUM(COALESCE(gs.pass_sacks, 0))
             FROM games g
             JOIN game_stats gs ON g.game_id = gs.game_id AND gs.team_id = ?1
             WHERE (g.home_team_id = ?1 OR g.away_team_id = ?1)
               AND g.season_id = ?2
               AND g.week < ?3
               AND g.week >= ?4
             GROUP BY g.game_id, g.week
             ORDER BY g.week DESC",
        )?;
        let rows = stmt.query_map(
            params![team_id.as_str(), season.as_u16(), week.as_u16(), floor],
            |row| {
                Ok(OffenseGameAgg {
                    week: Week::new(row.get::<_, u16>(0)?),
                    team_points: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    pass_yards: row.get(2)?,
                    rush_yards: row.get(3)?,
                    pass_tds: row.get(4)?,
                    rush_tds: row.get(5)?,
                    rec_tds: row.get(6)?,
                    turnovers: row.get(7)?,
                    sacks_allowed: row.get(8)?,
                })
            },
        )?;
        let mut aggs = Vec::new();
        for row in rows {
            aggs.push(row?);
        }
        Ok(aggs)
    }

    /// Per-game opponent production split by position against one defense,
    /// over the same-season window `[week - lookback, week)`.
    pub fn opponent_position_splits(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        lookback: u16,
    ) -> Result<Vec<OpponentSplitAgg>> {
        let floor = week.as_u16().saturating_sub(lookback);
        let mut stmt = self.conn.prepare(
            "SELECT g.week,
                    SUM(CASE WHEN p.position = 'QB' THEN COALESCE(gs.pass_yards, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'QB' THEN COALESCE(gs.pass_touchdowns, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'QB' THEN COALESCE(gs.pass_attempts, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'RB' THEN COALESCE(gs.rush_yards, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'RB' THEN COALESCE(gs.rush_touchdowns, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'RB' THEN COALESCE(gs.rush_attempts, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'RB' THEN COALESCE(gs.receiving_yards, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'WR' THEN COALESCE(gs.receiving_yards, 0) ELSE 0 END),
                    SUM(CASE WHEN p.position = 'TE' THEN COALESCE(gs.receiving_yards, 0) ELSE 0 END)
             FROM games g
             JOIN game_stats gs ON g.game_id = gs.game_id AND gs.team_id != ?1
             JOIN players p ON gs.player_id = p.player_id
             WHERE (g.home_team_id = ?1 OR g.away_team_id = ?1)
               AND g.season_id = ?2
               AND g.week < ?3
               AND g.week >= ?4
               AND p.position IN ('QB', 'RB', 'WR', 'TE')
             GROUP BY g.game_id, g.week
             ORDER BY g.week DESC",
        )?;
        let rows = stmt.query_map(
            params![team_id.as_str(), season.as_u16(), week.as_u16(), floor],
            |row| {
                Ok(OpponentSplitAgg {
                    week: Week::new(row.get::<_, u16>(0)?),
                    qb_pass_yards: row.get(1)?,
                    qb_pass_tds: row.get(2)?,
                    qb_pass_attempts: row.get(3)?,
                    rb_rush_yards: row.get(4)?,
                    rb_rush_tds: row.get(5)?,
                    rb_rush_attempts: row.get(6)?,
                    rb_rec_yards: row.get(7)?,
                    wr_rec_yards: row.get(8)?,
                    te_rec_yards: row.get(9)?,
                })
            },
        )?;
        let mut splits = Vec::new();
        for row in rows {
            splits.push(row?);
        }
        Ok(splits)
    }

    /// League-wide defensive averages over the window `[week - 8, week)`,
    /// for teams with at least 3 games, best points-allowed first.
    pub fn league_defense_averages(
        &self,
        season: Season,
        week: Week,
    ) -> Result<Vec<LeagueDefenseAvg>> {
        let floor = week.as_u16().saturating_sub(8);
        let mut stmt = self.conn.prepare(
            "SELECT team_id,
                    AVG(COALESCE(points_allowed, 0)),
                    AVG(COALESCE(sacks, 0)),
                    AVG(COALESCE(interceptions, 0) + COALESCE(fumbles_recovered, 0))
             FROM team_defense_stats
             WHERE season_id = ? AND week < ? AND week >= ?
             GROUP BY team_id
             HAVING COUNT(*) >= 3
             ORDER BY 2",
        )?;
        let rows = stmt.query_map(params![season.as_u16(), week.as_u16(), floor], |row| {
            Ok(LeagueDefenseAvg {
                team_id: TeamId::new(row.get::<_, String>(0)?),
                avg_points_allowed: row.get(1)?,
                avg_sacks: row.get(2)?,
                avg_turnovers: row.get(3)?,
            })
        })?;
        let mut avgs = Vec::new();
        for row in rows {
            avgs.push(row?);
        }
        Ok(avgs)
    }

    /// Raw counts behind the week-readiness verdict: totals, scored games,
    /// team-defense rows, and box-score rows still carrying synthetic
    /// collector ids (`<season>_<week>_<T1>_vs_<T2>`).
    pub fn readiness_counts(&self, season: Season, week: Week) -> Result<WeekReadinessCounts> {
        let games: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM games WHERE season_id = ? AND week = ?",
            params![season.as_u16(), week.as_u16()],
            |row| row.get(0),
        )?;
        let scored: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM games
             WHERE season_id = ? AND week = ?
               AND home_score IS NOT NULL AND away_score IS NOT NULL",
            params![season.as_u16(), week.as_u16()],
            |row| row.get(0),
        )?;
        let dst_rows: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM team_defense_stats WHERE season_id = ? AND week = ?",
            params![season.as_u16(), week.as_u16()],
            |row| row.get(0),
        )?;
        let synthetic: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM game_stats gs
             JOIN games g ON gs.game_id = g.game_id
             WHERE g.season_id = ? AND g.week = ? AND gs.game_id LIKE '%/_vs/_%' ESCAPE '/'",
            params![season.as_u16(), week.as_u16()],
            |row| row.get(0),
        )?;
        Ok(WeekReadinessCounts {
            games,
            scored_games: scored,
            dst_rows,
            synthetic_ids: synthetic,
        })
    }

    /// Number of games in a season with both scores recorded.
    pub fn completed_game_count(&self, season: Season) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM games
             WHERE season_id = ? AND home_score IS NOT NULL AND away_score IS NOT NULL",
            params![season.as_u16()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// The most recent `(season, week)` with a completed game, optionally
    /// restricted to a season set.
    pub fn latest_completed_game(
        &self,
        seasons: Option<&[Season]>,
    ) -> Result<Option<(Season, Week)>> {
        let mut sql = String::from(
            "SELECT season_id, week FROM games
             WHERE home_score IS NOT NULL AND away_score IS NOT NULL",
        );
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(seasons) = seasons {
            if !seasons.is_empty() {
                let placeholders = vec!["?"; seasons.len()].join(", ");
                sql.push_str(&format!(" AND season_id IN ({placeholders})"));
                for s in seasons {
                    bound.push(Box::new(s.as_u16()));
                }
            }
        }
        sql.push_str(" ORDER BY season_id DESC, week DESC LIMIT 1");

        let mut stmt = self.conn.prepare(&sql)?;
        let result = stmt.query_row(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            |row| Ok((row.get::<_, u16>(0)?, row.get::<_, u16>(1)?)),
        );
        match result {
            Ok((s, w)) => Ok(Some((Season::new(s), Week::new(w)))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All skill-position box-score rows for the given seasons, ordered by
    /// player then (season, week). This is the training scan.
    pub fn training_stat_rows(&self, seasons: &[Season]) -> Result<Vec<TrainingStatRow>> {
        if seasons.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; seasons.len()].join(", ");
        let sql = format!(
            "SELECT p.position, {} FROM game_stats gs
             JOIN games g ON gs.game_id = g.game_id
             JOIN players p ON gs.player_id = p.player_id
             WHERE g.season_id IN ({placeholders})
               AND p.position IN ('QB', 'RB', 'WR', 'TE')
             ORDER BY gs.player_id, g.season_id, g.week",
            GameStatRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let bound: Vec<Box<dyn rusqlite::ToSql>> = seasons
            .iter()
            .map(|s| Box::new(s.as_u16()) as Box<dyn rusqlite::ToSql>)
            .collect();
        let rows = stmt.query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            |row| {
                let position = parse_position_cell(&row.get::<_, String>(0)?);
                let stats = GameStatRow::from_row_at(row, 1)?;
                Ok(TrainingStatRow { position, stats })
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// All team-defense rows for the given seasons, ordered by team then
    /// (season, week).
    pub fn training_defense_rows(&self, seasons: &[Season]) -> Result<Vec<TeamDefenseRow>> {
        if seasons.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; seasons.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM team_defense_stats tds
             WHERE tds.season_id IN ({placeholders})
             ORDER BY tds.team_id, tds.season_id, tds.week",
            TeamDefenseRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let bound: Vec<Box<dyn rusqlite::ToSql>> = seasons
            .iter()
            .map(|s| Box::new(s.as_u16()) as Box<dyn rusqlite::ToSql>)
            .collect();
        let rows = stmt.query_map(
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
            TeamDefenseRow::from_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// All teams in the store.
    pub fn teams(&self) -> Result<Vec<TeamRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT team_id, team_name, city, division, conference FROM teams ORDER BY team_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TeamRow {
                team_id: TeamId::new(row.get::<_, String>(0)?),
                team_name: row.get(1)?,
                city: row.get(2)?,
                division: row.get(3)?,
                conference: row.get(4)?,
            })
        })?;
        let mut teams = Vec::new();
        for row in rows {
            teams.push(row?);
        }
        Ok(teams)
    }

    /// Display name for a team, falling back to the code itself.
    pub fn team_name(&self, team_id: &TeamId) -> Result<String> {
        let result = self.conn.query_row(
            "SELECT team_name FROM teams WHERE team_id = ?",
            params![team_id.as_str()],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(name) => Ok(name),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(team_id.as_str().to_string()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every scoring system row as a (name, column -> value) map. The map
    /// form lets the ruleset loader accept both current and legacy DST
    /// column names.
    pub fn scoring_system_rows(&self) -> Result<Vec<(String, HashMap<String, f64>)>> {
        let mut stmt = self.conn.prepare("SELECT * FROM scoring_systems")?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        let rows = stmt.query_map([], |row| {
            let mut name = String::new();
            let mut values = HashMap::new();
            for (idx, col) in column_names.iter().enumerate() {
                if col == "system_name" {
                    name = row.get::<_, String>(idx)?;
                } else if let Some(v) = opt_num(row, idx)? {
                    values.insert(col.clone(), v);
                }
            }
            Ok((name, values))
        })?;
        let mut systems = Vec::new();
        for row in rows {
            systems.push(row?);
        }
        Ok(systems)
    }

    /// Injury report lines for one `(season, week)`.
    pub fn injuries_for_week(&self, season: Season, week: Week) -> Result<Vec<InjuryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT season, week, team, position, full_name,
                    report_primary_injury, report_status, practice_status, date_modified
             FROM historical_injuries
             WHERE season = ? AND week = ?
             ORDER BY team, full_name",
        )?;
        let rows = stmt.query_map(params![season.as_u16(), week.as_u16()], InjuryRow::from_row)?;
        let mut injuries = Vec::new();
        for row in rows {
            injuries.push(row?);
        }
        Ok(injuries)
    }

    /// The most recent `(season, week)` carrying injury report lines.
    pub fn latest_injury_week(&self) -> Result<Option<(Season, Week)>> {
        let result = self.conn.query_row(
            "SELECT season, week FROM historical_injuries
             ORDER BY season DESC, week DESC LIMIT 1",
            [],
            |row| Ok((row.get::<_, u16>(0)?, row.get::<_, u16>(1)?)),
        );
        match result {
            Ok((s, w)) => Ok(Some((Season::new(s), Week::new(w)))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All team ids with a defensive row inside `[week - lookback, week)`,
    /// i.e. defenses active enough to project.
    pub fn active_defense_teams(
        &self,
        season: Season,
        week: Week,
        lookback: u16,
    ) -> Result<Vec<TeamId>> {
        let floor = week.as_u16().saturating_sub(lookback);
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT team_id FROM team_defense_stats
             WHERE season_id = ? AND week < ? AND week >= ?
             ORDER BY team_id",
        )?;
        let rows = stmt.query_map(params![season.as_u16(), week.as_u16(), floor], |row| {
            Ok(TeamId::new(row.get::<_, String>(0)?))
        })?;
        let mut teams = Vec::new();
        for row in rows {
            teams.push(row?);
        }
        Ok(teams)
    }

    /// Box scores for every skill player in one `(season, week)`, for the
    /// weekly rankings surface.
    pub fn week_stat_rows(&self, season: Season, week: Week) -> Result<Vec<TrainingStatRow>> {
        let sql = format!(
            "SELECT p.position, {} FROM game_stats gs
             JOIN games g ON gs.game_id = g.game_id
             JOIN players p ON gs.player_id = p.player_id
             WHERE g.season_id = ? AND g.week = ?
               AND p.position IN ('QB', 'RB', 'WR', 'TE')
             ORDER BY p.player_name",
            GameStatRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![season.as_u16(), week.as_u16()], |row| {
            let position = parse_position_cell(&row.get::<_, String>(0)?);
            let stats = GameStatRow::from_row_at(row, 1)?;
            Ok(TrainingStatRow { position, stats })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Defensive rows for every team in one `(season, week)`.
    pub fn week_defense_rows(&self, season: Season, week: Week) -> Result<Vec<TeamDefenseRow>> {
        let sql = format!(
            "SELECT {} FROM team_defense_stats tds
             WHERE tds.season_id = ? AND tds.week = ?
             ORDER BY tds.team_id",
            TeamDefenseRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![season.as_u16(), week.as_u16()],
            TeamDefenseRow::from_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Player names for a set of ids; used when labeling predictions.
    pub fn player_names(&self, ids: &[PlayerId]) -> Result<HashMap<PlayerId, String>> {
        let mut names = HashMap::new();
        if ids.is_empty() {
            return Ok(names);
        }
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT player_id, player_name FROM players WHERE player_id IN ({placeholders})"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let bound: Vec<Box<dyn rusqlite::ToSql>> = chunk
                .iter()
                .map(|id| Box::new(id.as_str().to_string()) as Box<dyn rusqlite::ToSql>)
                .collect();
            let rows = stmt.query_map(
                rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?;
            for row in rows {
                let (id, name) = row?;
                names.insert(PlayerId::new(id), name);
            }
        }
        Ok(names)
    }

    /// Player positions for a set of ids.
    pub fn player_positions(&self, ids: &[PlayerId]) -> Result<HashMap<PlayerId, Position>> {
        let mut positions = HashMap::new();
        if ids.is_empty() {
            return Ok(positions);
        }
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT player_id, position FROM players WHERE player_id IN ({placeholders})"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let bound: Vec<Box<dyn rusqlite::ToSql>> = chunk
                .iter()
                .map(|id| Box::new(id.as_str().to_string()) as Box<dyn rusqlite::ToSql>)
                .collect();
            let rows = stmt.query_map(
                rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?;
            for row in rows {
                let (id, pos) = row?;
                positions.insert(PlayerId::new(id), parse_position_cell(&pos));
            }
        }
        Ok(positions)
    }
}

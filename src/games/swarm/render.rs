//! Swarm rendering (read-only from the engine).

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};
use crate::time::now_ms;
use crate::widgets::ClickableList;

use super::actions::*;
use super::logic::BattlePhase;
use super::state::{BattleResult, Task, UnitKind};
use super::SwarmGame;

const BUILD_KEYS: [&str; 3] = ["1", "2", "3"];
const PREP_KEYS: [(&str, &str); 3] = [("h", "j"), ("k", "l"), ("n", "m")];

fn key_span(key: &str) -> Span<'static> {
    Span::styled(
        format!(" [{}] ", key),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn enabled_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn render(
    game: &SwarmGame,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let is_narrow = is_narrow_layout(area.width);
    let borders = if is_narrow {
        Borders::TOP | Borders::BOTTOM
    } else {
        Borders::ALL
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Reserves
            Constraint::Min(14),   // Machines + war/upgrades
            Constraint::Length(7), // Log
        ])
        .split(area);

    render_header(game, f, chunks[0], borders, click_state);

    let (machines_area, side_area) = if is_narrow {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(14), Constraint::Min(6)])
            .split(chunks[1]);
        (body[0], body[1])
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        (body[0], body[1])
    };

    render_machines(game, f, machines_area, borders, click_state);
    if game.view.show_upgrades {
        render_upgrades(game, f, side_area, borders, click_state);
    } else {
        render_war(game, f, side_area, borders, click_state);
    }
    render_log(game, f, chunks[2], borders);
}

fn render_header(
    game: &SwarmGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let s = game.engine.state();
    let mut cl = ClickableList::new();
    cl.push(Line::from(vec![
        Span::styled(" Power ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.2}GW", s.power),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Materials ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:.2}T", s.materials),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  Harvest {:.2}GW", s.total_harvest),
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    let status = if game.engine.is_defeated() {
        Span::styled(
            " All Horuses lost. The swarm cannot rebuild.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if game.engine.war_started() {
        Span::styled(
            " Humanity knows. Operation: Enduring Victory is underway.",
            Style::default().fg(Color::Red),
        )
    } else {
        Span::styled(
            " Unnoticed, for now.",
            Style::default().fg(Color::DarkGray),
        )
    };
    cl.push(Line::from(status));

    let reset_label = if game.view.confirm_reset {
        Span::styled(
            "Press again to wipe the swarm",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("Reset", Style::default().fg(Color::DarkGray))
    };
    cl.push_clickable(Line::from(vec![key_span("R"), reset_label]), RESET_GAME);

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Swarm ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_machines(
    game: &SwarmGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let s = engine.state();
    let mut cl = ClickableList::new();

    cl.push(Line::from(Span::styled(
        " Build (each needs a free Horus):",
        Style::default().fg(Color::Gray),
    )));
    for kind in UnitKind::ALL {
        let stats = engine.units().get(kind);
        let idx = kind.index();
        let cost = &stats.cost;
        let building = s.constructing.get(kind).len();
        let mut spans = vec![
            key_span(BUILD_KEYS[idx]),
            Span::styled(
                format!("{} x{}", stats.name, s.machines.get(kind)),
                enabled_style(engine.can_purchase(kind, 1)),
            ),
            Span::styled(
                format!(
                    "  {}T/{}GW/{}s",
                    cost.materials, cost.energy, cost.construction_secs
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if building > 0 {
            spans.push(Span::styled(
                format!("  (+{building} building)"),
                Style::default().fg(Color::Green),
            ));
        }
        cl.push_clickable(Line::from(spans), BUILD_BASE + idx as u16);
    }

    cl.push(Line::from(""));
    cl.push(Line::from(Span::styled(
        " Collect power (Horuses cannot collect):",
        Style::default().fg(Color::Gray),
    )));
    for (kind, (add_key, remove_key)) in [(UnitKind::Khopesh, ("4", "5")), (UnitKind::Scarab, ("6", "7"))] {
        let stats = engine.units().get(kind);
        let idx = kind.index() as u16;
        let collecting = s.count_busy(kind, Task::Consuming);
        cl.push_clickable(
            Line::from(vec![
                key_span(add_key),
                Span::styled(
                    format!("{} collect ({collecting})", stats.name),
                    enabled_style(s.idle(kind) > 0),
                ),
            ]),
            COLLECT_ADD_BASE + idx,
        );
        cl.push_clickable(
            Line::from(vec![
                key_span(remove_key),
                Span::styled(
                    format!("{} recall", stats.name),
                    enabled_style(collecting > 0),
                ),
            ]),
            COLLECT_REMOVE_BASE + idx,
        );
    }
    let scarab = &engine.units().scarab;
    cl.push(Line::from(Span::styled(
        format!(
            " Scarab: {:.2}T + {:.2}GW / 10s  Khopesh: {:.2}GW / 10s",
            scarab.collection_rate * 10.0,
            scarab.consume_output * 10.0,
            engine.units().khopesh.consume_output * 10.0,
        ),
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Green))
        .title(" Machines ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_war(
    game: &SwarmGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let s = engine.state();
    let mut cl = ClickableList::new();

    cl.push_clickable(
        Line::from(vec![
            key_span("u"),
            Span::styled("Show upgrades", Style::default().fg(Color::Magenta)),
        ]),
        TOGGLE_UPGRADES,
    );
    cl.push(Line::from(""));

    match engine.battle_phase(now_ms()) {
        BattlePhase::Dormant => {
            cl.push(Line::from(" Operation: Enduring Victory has not begun."));
            cl.push(Line::from(Span::styled(
                " Your independence has not yet been noticed by humanity.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        BattlePhase::Quiet => match &s.battle.result {
            Some(result) => push_result(&mut cl, game, result),
            None => cl.push(Line::from(" No battles available.")),
        },
        BattlePhase::Incoming { force, secs_left } => {
            cl.push(Line::from(Span::styled(
                format!(" Prepare for battle! Enemy strength {force}."),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            cl.push(Line::from(format!(
                " They reach the swarm in {secs_left}s. Uncommitted, everyone defends."
            )));
            for kind in UnitKind::ALL {
                let idx = kind.index();
                let (add_key, remove_key) = PREP_KEYS[idx];
                let name = engine.units().get(kind).name;
                let prepped = s.count_busy(kind, Task::Prepped);
                cl.push_clickable(
                    Line::from(vec![
                        key_span(add_key),
                        Span::styled(
                            format!("Commit {name} ({prepped})"),
                            enabled_style(s.idle(kind) > 0),
                        ),
                    ]),
                    PREP_ADD_BASE + idx as u16,
                );
                cl.push_clickable(
                    Line::from(vec![
                        key_span(remove_key),
                        Span::styled(format!("Withdraw {name}"), enabled_style(prepped > 0)),
                    ]),
                    PREP_REMOVE_BASE + idx as u16,
                );
            }
            cl.push_clickable(
                Line::from(vec![
                    key_span("b"),
                    Span::styled(
                        "Strike first!",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    ),
                ]),
                STRIKE_FIRST,
            );
        }
    }

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Red))
        .title(" War ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn push_result(cl: &mut ClickableList<'static>, game: &SwarmGame, result: &BattleResult) {
    let deployed = result.original_force.total();
    cl.push(Line::from(format!(
        " Enduring Victory came at you with {}; you lost {} of {}.",
        result.original_enemy, result.total_losses, deployed
    )));
    for kind in UnitKind::ALL {
        cl.push(Line::from(Span::styled(
            format!(
                "   {}: {} lost (deployed {})",
                game.engine.units().get(kind).name,
                result.losses.get(kind),
                result.original_force.get(kind)
            ),
            Style::default().fg(Color::Gray),
        )));
    }
    let left = result.enemy_left_percent();
    let verdict = if left > 40.0 {
        format!(" The enemy withdrew with {left:.2}% of their forces left.")
    } else if result.enemy_force > 0 {
        format!(" The enemy limped away with only {left:.2}% of their forces left.")
    } else {
        " The enemy force was completely annihilated.".to_string()
    };
    cl.push(Line::from(verdict));
    cl.push_clickable(
        Line::from(vec![
            key_span("x"),
            Span::styled("Dismiss", Style::default().fg(Color::DarkGray)),
        ]),
        DISMISS_RESULT,
    );
}

fn render_upgrades(
    game: &SwarmGame,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let engine = &game.engine;
    let mut cl = ClickableList::new();
    cl.push_clickable(
        Line::from(vec![
            key_span("u"),
            Span::styled("Back to war room", Style::default().fg(Color::Magenta)),
        ]),
        TOGGLE_UPGRADES,
    );

    let listed = engine.listed_upgrades();
    if listed.is_empty() {
        cl.push(Line::from(" None."));
    }
    for (i, upgrade) in listed.iter().enumerate() {
        let key = ((b'a' + i as u8) as char).to_string();
        let purchasable = engine.upgrade_purchasable(upgrade);
        let action = BUY_UPGRADE_BASE + i as u16;
        cl.push_clickable(
            Line::from(vec![
                key_span(&key),
                Span::styled(
                    upgrade.name,
                    enabled_style(purchasable).add_modifier(Modifier::BOLD),
                ),
            ]),
            action,
        );
        cl.push_clickable(
            Line::from(Span::styled(
                format!("     {}", upgrade.description),
                Style::default().fg(Color::DarkGray),
            )),
            action,
        );
    }

    let inner_width = match borders {
        Borders::ALL => area.width.saturating_sub(2),
        _ => area.width,
    };
    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Upgrades ");
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, inner_width);
    }
    let widget = Paragraph::new(cl.into_lines())
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn render_log(game: &SwarmGame, f: &mut Frame, area: Rect, borders: Borders) {
    let max_lines = area.height.saturating_sub(2) as usize;
    let start = game.log.len().saturating_sub(max_lines);
    let lines: Vec<Line> = game.log[start..]
        .iter()
        .map(|entry| {
            let style = if entry.is_important {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(Span::styled(format!(" > {}", entry.text), style))
        })
        .collect();

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Log ");
    let widget = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, Context, InteractiveElement,
    IntoElement, MouseButton, MouseDownEvent, MouseMoveEvent, MouseUpEvent, ParentElement,
    SLIDER_TRACK_WIDTH, Selectable, SharedString, SliderDragState, Styled, StyledExt, Window, div,
    h_flex, px, v_flex,
};
use crate::options::{CONTROLS, Control, OptionField, PoseOptions, SliderKind};

impl AppView {
    pub(super) fn render_settings_panel(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let foreground = theme.foreground;
        let muted_foreground = theme.muted_foreground;
        let border = theme.border;
        let group_box = theme.group_box;

        let Some(options) = self.orchestrator.as_ref().map(|o| o.options().clone()) else {
            return div()
                .text_sm()
                .text_color(muted_foreground)
                .child("Starting detector...")
                .into_any_element();
        };

        let mut panel = v_flex()
            .gap_3()
            .p_4()
            .rounded_lg()
            .border_1()
            .border_color(border)
            .bg(group_box)
            .child(
                div()
                    .text_sm()
                    .font_semibold()
                    .text_color(foreground)
                    .child("Settings"),
            );

        for control in CONTROLS.iter() {
            panel = panel.child(match *control {
                Control::Toggle { title, field } => self.render_toggle(title, field, &options, cx),
                Control::Slider { title, field, kind } => match kind {
                    SliderKind::Discrete(labels) => {
                        self.render_discrete_slider(title, field, labels, &options, cx)
                    }
                    SliderKind::Range { min, max, step } => {
                        self.render_range_slider(title, field, (min, max, step), &options, cx)
                    }
                },
            });
        }

        panel.into_any_element()
    }

    fn render_toggle(
        &mut self,
        title: &'static str,
        field: OptionField,
        options: &PoseOptions,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let foreground = cx.theme().foreground;
        let enabled = options.scalar(field) >= 0.5;
        h_flex()
            .justify_between()
            .items_center()
            .child(div().text_sm().text_color(foreground).child(title))
            .child(
                Button::new(SharedString::from(format!("toggle-{title}")))
                    .label(if enabled { "On" } else { "Off" })
                    .selected(enabled)
                    .outline()
                    .on_click(cx.listener(move |this, _, _, cx| {
                        this.mutate_options(|opts| opts.toggle(field));
                        cx.notify();
                    })),
            )
            .into_any_element()
    }

    fn render_discrete_slider(
        &mut self,
        title: &'static str,
        field: OptionField,
        labels: &'static [&'static str],
        options: &PoseOptions,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let foreground = cx.theme().foreground;
        let current = options.scalar(field).round() as usize;

        let mut segments = h_flex().gap_1();
        for (idx, label) in labels.iter().enumerate() {
            segments = segments.child(
                Button::new(SharedString::from(format!("{title}-{label}")))
                    .label(*label)
                    .selected(idx == current)
                    .outline()
                    .on_click(cx.listener(move |this, _, _, cx| {
                        this.mutate_options(|opts| opts.set_scalar(field, idx as f32));
                        cx.notify();
                    })),
            );
        }

        v_flex()
            .gap_1()
            .child(div().text_sm().text_color(foreground).child(title))
            .child(segments)
            .into_any_element()
    }

    fn render_range_slider(
        &mut self,
        title: &'static str,
        field: OptionField,
        (min, max, step): (f32, f32, f32),
        options: &PoseOptions,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let foreground = theme.foreground;
        let muted_foreground = theme.muted_foreground;
        let muted = theme.muted;
        let primary = theme.primary;

        let value = options.scalar(field);
        let fraction = ((value - min) / (max - min)).clamp(0.0, 1.0);

        let track = div()
            .w(px(SLIDER_TRACK_WIDTH))
            .h(px(8.0))
            .rounded_md()
            .bg(muted)
            .cursor_pointer()
            .child(
                div()
                    .w(px(SLIDER_TRACK_WIDTH * fraction))
                    .h_full()
                    .rounded_md()
                    .bg(primary),
            )
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(move |this, event: &MouseDownEvent, _, cx| {
                    let current = this
                        .orchestrator
                        .as_ref()
                        .map(|o| o.options().scalar(field))
                        .unwrap_or(min);
                    this.slider_drag = Some(SliderDragState {
                        field,
                        min,
                        max,
                        step,
                        start_pointer_x: f32::from(event.position.x),
                        start_value: current,
                    });
                    cx.notify();
                }),
            );

        v_flex()
            .gap_1()
            .child(
                h_flex()
                    .justify_between()
                    .items_center()
                    .child(div().text_sm().text_color(foreground).child(title))
                    .child(
                        div()
                            .text_xs()
                            .text_color(muted_foreground)
                            .child(format!("{value:.2}")),
                    ),
            )
            .child(track)
            .into_any_element()
    }

    pub(super) fn update_slider_drag(
        &mut self,
        event: &MouseMoveEvent,
        _: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        let Some(drag) = &self.slider_drag else {
            return;
        };
        if !event.dragging() {
            self.slider_drag = None;
            cx.notify();
            return;
        }

        let delta = f32::from(event.position.x) - drag.start_pointer_x;
        let raw = drag.start_value + delta / SLIDER_TRACK_WIDTH * (drag.max - drag.min);
        let snapped = (((raw - drag.min) / drag.step).round() * drag.step + drag.min)
            .clamp(drag.min, drag.max);
        let field = drag.field;

        let changed = self
            .orchestrator
            .as_ref()
            .is_some_and(|o| (o.options().scalar(field) - snapped).abs() > f32::EPSILON);
        if changed {
            self.mutate_options(|opts| opts.set_scalar(field, snapped));
            cx.notify();
        }
    }

    pub(super) fn finish_slider_drag(
        &mut self,
        _: &MouseUpEvent,
        _: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if self.slider_drag.take().is_some() {
            cx.notify();
        }
    }

    /// Every panel interaction funnels through here: mutate a snapshot of the
    /// record, then hand the whole thing back to the orchestrator.
    fn mutate_options(&mut self, mutate: impl FnOnce(&mut PoseOptions)) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            let mut options = orchestrator.options().clone();
            mutate(&mut options);
            orchestrator.apply_options(options);
        }
    }
}

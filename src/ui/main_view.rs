use super::render_util::rgba_to_render_image;
use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, Context, FluentBuilder,
    GridDragState, InteractiveElement, IntoElement, MouseButton, MouseDownEvent, MouseMoveEvent,
    MouseUpEvent, ObjectFit, ParentElement, SETTINGS_PANEL_WIDTH, SharedString, Styled, StyledExt,
    StyledImage, Window, div, h_flex, img, px, v_flex,
};

const GRID_VIEW_SIZE: (u32, u32) = (480, 360);

impl AppView {
    pub(super) fn render_main(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        // Latest result wins; anything older in the channel is already stale.
        let mut latest = None;
        if let Some(rx) = self.result_rx.as_ref() {
            while let Ok(result) = rx.try_recv() {
                latest = Some(result);
            }
        }
        if let (Some(result), Some(orchestrator)) = (latest.as_ref(), self.orchestrator.as_mut()) {
            orchestrator.handle_result(result);
        }

        let viewport_size = window.viewport_size();
        let viewport = (
            f32::from(viewport_size.width).max(1.0) as u32,
            f32::from(viewport_size.height).max(1.0) as u32,
        );
        while let Ok(frame) = self.frame_rx.try_recv() {
            if let Some(orchestrator) = self.orchestrator.as_mut() {
                if let Err(err) = orchestrator.handle_frame(frame, viewport) {
                    log::warn!("frame submission failed: {err}");
                }
            }
        }

        if latest.is_some() {
            self.refresh_images(window, cx);
        }

        let theme = cx.theme();
        let background = theme.background;
        let foreground = theme.foreground;
        let muted_foreground = theme.muted_foreground;
        let accent = theme.accent;

        let loaded = self.orchestrator.as_ref().is_some_and(|o| o.loaded());
        let fps_text = self
            .orchestrator
            .as_ref()
            .map(|o| format!("{:.0} FPS", o.fps().fps()))
            .unwrap_or_else(|| "--".to_string());
        let axis_label = self
            .orchestrator
            .as_ref()
            .map(|o| o.grid().axis_label())
            .unwrap_or_default();
        let source_label = self
            .selected_source
            .and_then(|idx| self.sources.get(idx))
            .map(|selection| selection.label())
            .unwrap_or_else(|| "no source".to_string());

        let mut header = h_flex()
            .justify_between()
            .items_center()
            .px_4()
            .py_2()
            .child(
                h_flex()
                    .gap_3()
                    .items_center()
                    .child(
                        div()
                            .font_semibold()
                            .text_color(foreground)
                            .child("Pose Lens"),
                    )
                    .child(
                        div()
                            .text_xs()
                            .text_color(muted_foreground)
                            .child(fps_text),
                    ),
            )
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .text_xs()
                            .text_color(muted_foreground)
                            .child(source_label),
                    )
                    .when(self.sources.len() > 1, |this| {
                        let picker_label = if self.picker_open { "close" } else { "switch" };
                        this.child(
                            Button::new(SharedString::from("source-picker-toggle"))
                                .outline()
                                .label(picker_label)
                                .on_click(cx.listener(|this, _, _, cx| {
                                    this.picker_open = !this.picker_open;
                                    cx.notify();
                                })),
                        )
                    }),
            );

        if let Some(err) = &self.source_error {
            header = header.child(div().text_xs().text_color(accent).child(err.clone()));
        }

        let canvas_view: AnyElement = if let Some(image) = &self.canvas_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .rounded_lg()
                .into_any_element()
        } else {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(muted_foreground)
                .child("Waiting for input...")
                .into_any_element()
        };

        let mut canvas_card = div()
            .relative()
            .flex_1()
            .min_h(px(240.0))
            .rounded_lg()
            .overflow_hidden()
            .bg(gpui::rgb(0x000000))
            .child(canvas_view);

        if !loaded {
            canvas_card = canvas_card.child(
                div()
                    .absolute()
                    .top(px(0.0))
                    .left(px(0.0))
                    .size_full()
                    .flex()
                    .items_center()
                    .justify_center()
                    .bg(gpui::rgba(0x00000088))
                    .child(
                        div()
                            .text_sm()
                            .text_color(foreground)
                            .child("⟳ Waiting for the first detection..."),
                    ),
            );
        }

        let grid_view: AnyElement = if let Some(image) = &self.grid_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .rounded_lg()
                .into_any_element()
        } else {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(muted_foreground)
                .child("No world landmarks yet")
                .into_any_element()
        };

        let grid_card = div()
            .relative()
            .h(px(GRID_VIEW_SIZE.1 as f32))
            .rounded_lg()
            .overflow_hidden()
            .bg(gpui::rgb(0x0f1419))
            .cursor_pointer()
            .on_mouse_down(MouseButton::Left, cx.listener(Self::start_grid_drag))
            .on_mouse_move(cx.listener(Self::update_grid_drag))
            .on_mouse_up(MouseButton::Left, cx.listener(Self::finish_grid_drag))
            .on_mouse_up_out(MouseButton::Left, cx.listener(Self::finish_grid_drag))
            .child(grid_view)
            .child(
                h_flex()
                    .absolute()
                    .top(px(8.0))
                    .left(px(8.0))
                    .gap_1()
                    .items_center()
                    .child(
                        div()
                            .text_xs()
                            .text_color(muted_foreground)
                            .child(axis_label),
                    )
                    .child(
                        Button::new(SharedString::from("grid-zoom-in"))
                            .ghost()
                            .label("+")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.adjust_grid_zoom(200.0, window, cx);
                            })),
                    )
                    .child(
                        Button::new(SharedString::from("grid-zoom-out"))
                            .ghost()
                            .label("−")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.adjust_grid_zoom(-200.0, window, cx);
                            })),
                    ),
            );

        let left_pane = v_flex()
            .flex_1()
            .gap_3()
            .child(canvas_card)
            .child(grid_card);

        let settings = self.render_settings_panel(cx);
        let right_pane = div().w(px(SETTINGS_PANEL_WIDTH)).child(settings);

        let mut root = v_flex()
            .size_full()
            .bg(background)
            .on_mouse_move(cx.listener(Self::update_slider_drag))
            .on_mouse_up(MouseButton::Left, cx.listener(Self::finish_slider_drag))
            .child(header)
            .child(
                h_flex()
                    .flex_1()
                    .gap_3()
                    .p_4()
                    .items_start()
                    .child(left_pane)
                    .child(right_pane),
            );

        if self.picker_open && !self.sources.is_empty() {
            let sources = self.sources.clone();
            let selected = self.selected_source.unwrap_or(0);
            let picker = self.render_source_picker(sources, selected, None, true, cx);
            root = root.child(
                div()
                    .absolute()
                    .top(px(48.0))
                    .right(px(16.0))
                    .w(px(360.0))
                    .child(picker),
            );
        }

        root.into_any_element()
    }

    fn refresh_images(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let (canvas_image, grid_image) = {
            let Some(orchestrator) = self.orchestrator.as_ref() else {
                return;
            };
            let canvas = orchestrator.canvas();
            let canvas_image = rgba_to_render_image(
                canvas.data(),
                canvas.width(),
                canvas.height(),
                orchestrator.mirror(),
            );
            let grid_pixels = orchestrator
                .grid()
                .render(GRID_VIEW_SIZE.0, GRID_VIEW_SIZE.1);
            let grid_image =
                rgba_to_render_image(&grid_pixels, GRID_VIEW_SIZE.0, GRID_VIEW_SIZE.1, false);
            (canvas_image, grid_image)
        };

        // Drop the replaced GPU textures; the sprite atlas would otherwise
        // keep every frame and memory climbs fast while video runs.
        if let Some(image) = canvas_image {
            if let Some(old_image) = self.canvas_image.replace(image) {
                cx.drop_image(old_image, Some(window));
            }
        }
        if let Some(image) = grid_image {
            if let Some(old_image) = self.grid_image.replace(image) {
                cx.drop_image(old_image, Some(window));
            }
        }
    }

    fn adjust_grid_zoom(&mut self, delta: f32, window: &mut Window, cx: &mut Context<'_, Self>) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.grid_mut().zoom_by(delta);
            self.refresh_images(window, cx);
            cx.notify();
        }
    }

    fn start_grid_drag(
        &mut self,
        event: &MouseDownEvent,
        _: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        self.grid_drag = Some(GridDragState {
            last_x: f32::from(event.position.x),
            last_y: f32::from(event.position.y),
        });
        cx.notify();
    }

    fn update_grid_drag(
        &mut self,
        event: &MouseMoveEvent,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        let Some(drag) = &mut self.grid_drag else {
            return;
        };
        if !event.dragging() {
            self.grid_drag = None;
            cx.notify();
            return;
        }

        let (x, y) = (f32::from(event.position.x), f32::from(event.position.y));
        let (dx, dy) = (x - drag.last_x, y - drag.last_y);
        drag.last_x = x;
        drag.last_y = y;

        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.grid_mut().orbit(dx, dy);
            self.refresh_images(window, cx);
            cx.notify();
        }
    }

    fn finish_grid_drag(
        &mut self,
        _: &MouseUpEvent,
        _: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if self.grid_drag.take().is_some() {
            cx.notify();
        }
    }
}
